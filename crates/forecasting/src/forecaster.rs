use std::fmt;

use analysis_core::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::debug;

use crate::arima::{ArimaModel, ArimaOrder, PredictionType, SeasonalOrder};
use crate::smoother::Smoother;
use crate::state::ModelState;

/// Model family used to produce forecasts.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastMethod {
    Smoother(Smoother),
    Arima {
        order: ArimaOrder,
        prediction_type: PredictionType,
    },
    Sarimax {
        order: ArimaOrder,
        seasonal_order: SeasonalOrder,
    },
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastMethod::Smoother(smoother) => {
                write!(f, "Smoothing based forecast: {}", smoother.description())
            }
            ForecastMethod::Arima { order, .. } => {
                write!(f, "ARIMA based forecast: Orders = {}", order)
            }
            ForecastMethod::Sarimax {
                order,
                seasonal_order,
            } => write!(
                f,
                "SARIMAX based forecast: Orders = {}, Seasonal Orders = {}",
                order, seasonal_order
            ),
        }
    }
}

/// Produces fixed-horizon forecasts and keeps the fitted ARIMA/SARIMAX model
/// between calls until [`Forecaster::reset`].
#[derive(Debug, Clone)]
pub struct Forecaster {
    method: ForecastMethod,
    forecast_horizon: usize,
    remove_mean: bool,
    model: ModelState<ArimaModel>,
}

impl Forecaster {
    pub fn new(
        method: ForecastMethod,
        forecast_horizon: usize,
        remove_mean: bool,
    ) -> AnalysisResult<Self> {
        if forecast_horizon == 0 {
            return Err(AnalysisError::Config(
                "Forecast horizon must be at least 1".to_string(),
            ));
        }
        if let ForecastMethod::Sarimax { seasonal_order, .. } = &method {
            seasonal_order.validate()?;
        }
        Ok(Self {
            method,
            forecast_horizon,
            remove_mean,
            model: ModelState::Unfitted,
        })
    }

    pub fn method(&self) -> &ForecastMethod {
        &self.method
    }

    pub fn forecast_horizon(&self) -> usize {
        self.forecast_horizon
    }

    pub fn remove_mean(&self) -> bool {
        self.remove_mean
    }

    /// Fitted ARIMA/SARIMAX model, if any.
    pub fn model(&self) -> Option<&ArimaModel> {
        self.model.get()
    }

    pub fn smoother(&self) -> Option<&Smoother> {
        match &self.method {
            ForecastMethod::Smoother(smoother) => Some(smoother),
            _ => None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        match &self.method {
            ForecastMethod::Smoother(smoother) => smoother.is_fitted(),
            _ => self.model.is_fitted(),
        }
    }

    pub fn description(&self) -> String {
        self.method.to_string()
    }

    /// Clear every fitted model so the next call starts cold.
    pub fn reset(&mut self) {
        if let ForecastMethod::Smoother(smoother) = &mut self.method {
            smoother.reset();
        }
        self.model.clear();
    }

    /// Forecast `forecast_horizon` points past the end of `series`.
    pub fn forecast(&mut self, series: &[f64]) -> AnalysisResult<Vec<f64>> {
        let (working, offset) = self.prepare(series)?;
        let horizon = self.forecast_horizon;

        let forecast = match &mut self.method {
            ForecastMethod::Smoother(smoother) => smoother.extend(&working, horizon)?,
            _ => {
                let n = working.len();
                self.predict_arima(&working, n, n + horizon - 1)?
            }
        };

        Ok(forecast.into_iter().map(|v| v + offset).collect())
    }

    /// Predict positions `start..=end` of `series` with ARIMA or SARIMAX.
    pub fn forecast_range(
        &mut self,
        series: &[f64],
        start: usize,
        end: usize,
    ) -> AnalysisResult<Vec<f64>> {
        if let ForecastMethod::Smoother(_) = self.method {
            return Err(AnalysisError::Config(
                "Explicit forecast ranges are only supported by arima and sarimax".to_string(),
            ));
        }
        let (working, offset) = self.prepare(series)?;
        let forecast = self.predict_arima(&working, start, end)?;
        Ok(forecast.into_iter().map(|v| v + offset).collect())
    }

    fn prepare(&self, series: &[f64]) -> AnalysisResult<(Vec<f64>, f64)> {
        if series.is_empty() {
            return Err(AnalysisError::InsufficientData(
                "Cannot forecast from an empty series".to_string(),
            ));
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::InvalidData(
                "Forecast input contains NaN or infinite values".to_string(),
            ));
        }

        if self.remove_mean {
            let offset = series.mean();
            Ok((series.iter().map(|v| v - offset).collect(), offset))
        } else {
            Ok((series.to_vec(), 0.0))
        }
    }

    fn predict_arima(&mut self, series: &[f64], start: usize, end: usize) -> AnalysisResult<Vec<f64>> {
        let (order, seasonal, include_mean, typ) = match &self.method {
            ForecastMethod::Arima {
                order,
                prediction_type,
            } => (*order, SeasonalOrder::default(), true, *prediction_type),
            ForecastMethod::Sarimax {
                order,
                seasonal_order,
            } => (*order, *seasonal_order, false, PredictionType::Levels),
            ForecastMethod::Smoother(_) => {
                return Err(AnalysisError::Config(
                    "Smoothing forecasts have no ARIMA model".to_string(),
                ))
            }
        };

        if !self.model.is_fitted() {
            debug!("Fitting ARIMA{}x{} on {} observations", order, seasonal, series.len());
        }
        let model = self
            .model
            .fit_with(|| ArimaModel::fit(series, order, seasonal, include_mean))?;
        model.predict(start, end, typ)
    }
}

/// String-keyed forecaster settings as read from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecasterConfig {
    pub method: String,
    pub forecast_horizon: usize,
    pub arima_orders: (usize, usize, usize),
    pub arima_prediction_type: String,
    pub sarimax_orders: (usize, usize, usize),
    pub sarimax_seasonal_order: (usize, usize, usize, usize),
    pub remove_mean: bool,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            method: "smoother".to_string(),
            forecast_horizon: 5,
            arima_orders: (1, 0, 1),
            arima_prediction_type: "levels".to_string(),
            sarimax_orders: (1, 0, 1),
            sarimax_seasonal_order: (0, 0, 0, 0),
            remove_mean: false,
        }
    }
}

impl ForecasterConfig {
    pub fn build(self, smoother: Option<Smoother>) -> AnalysisResult<Forecaster> {
        let method = match self.method.trim().to_ascii_lowercase().as_str() {
            "smoother" => ForecastMethod::Smoother(smoother.ok_or_else(|| {
                AnalysisError::Config(
                    "The smoother forecast method requires a smoother configuration".to_string(),
                )
            })?),
            "arima" => {
                let (p, d, q) = self.arima_orders;
                ForecastMethod::Arima {
                    order: ArimaOrder::new(p, d, q),
                    prediction_type: self.arima_prediction_type.parse()?,
                }
            }
            "sarimax" => {
                let (p, d, q) = self.sarimax_orders;
                let (sp, sd, sq, s) = self.sarimax_seasonal_order;
                ForecastMethod::Sarimax {
                    order: ArimaOrder::new(p, d, q),
                    seasonal_order: SeasonalOrder::new(sp, sd, sq, s),
                }
            }
            other => {
                return Err(AnalysisError::Config(format!(
                    "The {} forecast method is not supported, use one of: smoother, arima, sarimax",
                    other
                )))
            }
        };
        Forecaster::new(method, self.forecast_horizon, self.remove_mean)
    }
}
