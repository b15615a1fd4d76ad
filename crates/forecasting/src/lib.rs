pub mod arima;
pub mod backtest;
pub mod exp_smoothing;
pub mod forecaster;
pub mod optimize;
pub mod polyfit;
pub mod smoother;
pub mod state;

pub use arima::{ArimaModel, ArimaOrder, PredictionType, SeasonalOrder};
pub use backtest::{rolling_forecast, BacktestSummary, WindowForecast};
pub use exp_smoothing::{ExponentialSmoothing, TrendKind};
pub use forecaster::{ForecastMethod, Forecaster, ForecasterConfig};
pub use polyfit::Polynomial;
pub use smoother::{Smoother, SmootherConfig, SmootherModel, SmoothingMethod};
pub use state::ModelState;
