use crate::{
    config::{EstimatorConfig, ModelSource},
    error::EstimatorError,
    features::{DURATION_SCHEMA, FARE_SCHEMA, PEAK_SCHEMA},
    model::{Model, ModelArtifact, Predictor},
    speed::SpeedTable,
    zones::ZoneTable,
};

/// Everything an estimate reads: reference tables and the three models.
/// Built once at startup and never mutated; share it by reference.
#[derive(Debug)]
pub struct EstimatorContext {
    pub zones: ZoneTable,
    pub speed_h: SpeedTable,
    pub speed_m: SpeedTable,
    pub peak: Model,
    pub duration: Model,
    pub fare: Model,
}

impl EstimatorContext {
    /// Assembles a context from loaded parts, rejecting any model whose
    /// declared inputs differ from the vector it will be handed.
    pub fn new(
        zones: ZoneTable,
        speed_h: SpeedTable,
        speed_m: SpeedTable,
        peak: Model,
        duration: Model,
        fare: Model,
    ) -> Result<Self, EstimatorError> {
        peak.check_schema(PEAK_SCHEMA)?;
        duration.check_schema(DURATION_SCHEMA)?;
        fare.check_schema(FARE_SCHEMA)?;
        Ok(Self {
            zones,
            speed_h,
            speed_m,
            peak,
            duration,
            fare,
        })
    }

    pub fn load(config: &EstimatorConfig) -> Result<Self, EstimatorError> {
        let zones = ZoneTable::from_path(&config.zones)?;
        let speed_h = SpeedTable::from_path(&config.average_speed_h, &config.speed_h_column)?;
        let speed_m = SpeedTable::from_path(&config.average_speed_m, &config.speed_m_column)?;
        let peak = load_model("peak", &config.peak_model)?;
        let duration = load_model("duration", &config.duration_model)?;
        let fare = load_model("fare", &config.fare_model)?;
        let ctx = Self::new(zones, speed_h, speed_m, peak, duration, fare)?;
        tracing::info!("models loaded; schemas verified for peak, duration and fare");
        Ok(ctx)
    }
}

fn load_model(name: &str, source: &ModelSource) -> Result<Model, EstimatorError> {
    let predictor: Box<dyn Predictor> = match source {
        ModelSource::Json { path } => Box::new(ModelArtifact::from_path(path)?),
        #[cfg(feature = "torch")]
        ModelSource::Torchscript { path, meta } => Box::new(
            crate::model::torchscript::TorchScriptModel::new(path, meta)?,
        ),
        #[cfg(not(feature = "torch"))]
        ModelSource::Torchscript { path, .. } => {
            return Err(EstimatorError::InvalidModel {
                filepath: path.display().to_string(),
                error: String::from("TorchScript models require the `torch` feature"),
            })
        }
    };
    tracing::info!(
        "loaded {} model; feat_list[{}]: {:?}",
        name,
        predictor.feature_names().len(),
        predictor.feature_names()
    );
    Ok(Model::new(name, predictor))
}
