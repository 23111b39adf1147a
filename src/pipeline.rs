use crate::{
    context::EstimatorContext,
    error::{EstimatorError, TripEnd},
    features::{day_of_week, TripFeatures, REFERENCE_YEAR},
    types::{PredictionResult, TripRequest},
    zones::TripCoordinates,
};

/// Resolves a request into its derived trip features, without touching any
/// model. Fails before any vector exists when the date or a zone is bad.
pub fn derive_features(
    ctx: &EstimatorContext,
    req: &TripRequest,
) -> Result<TripFeatures, EstimatorError> {
    req.validate()?;
    let day_of_week = day_of_week(REFERENCE_YEAR, req.month, req.day_of_month)?;

    let pickup = ctx.zones.lookup(req.pickup_zone).ok_or(EstimatorError::ZoneNotFound {
        end: TripEnd::Pickup,
        zone_id: req.pickup_zone,
    })?;
    let dropoff = ctx.zones.lookup(req.dropoff_zone).ok_or(EstimatorError::ZoneNotFound {
        end: TripEnd::Dropoff,
        zone_id: req.dropoff_zone,
    })?;
    let coords = TripCoordinates { pickup, dropoff };

    let avg_speed_h = ctx.speed_h.lookup(&coords, req.month, req.day_of_month, req.hour);
    let avg_speed_m = ctx.speed_m.lookup(&coords, req.month, req.day_of_month, req.hour);
    if avg_speed_h == 0.0 && avg_speed_m == 0.0 {
        tracing::debug!(
            "no historical speed for zones {} -> {} at {}/{} {}h",
            req.pickup_zone,
            req.dropoff_zone,
            req.month,
            req.day_of_month,
            req.hour
        );
    }

    Ok(TripFeatures::new(
        req.passenger_count,
        coords,
        req.month,
        req.day_of_month,
        req.hour,
        day_of_week,
        avg_speed_h,
        avg_speed_m,
    ))
}

/// Peak label, duration and fare for one trip. The fare vector is only
/// assembled once the peak classifier has answered, since it consumes that
/// answer as an input.
pub fn estimate(
    ctx: &EstimatorContext,
    req: &TripRequest,
) -> Result<PredictionResult, EstimatorError> {
    let trip = derive_features(ctx, req)?;
    tracing::debug!(
        "zones {} -> {}: haversine={:.3}km manhattan={:.3}km dow={} speed_h={:.3} speed_m={:.3}",
        req.pickup_zone,
        req.dropoff_zone,
        trip.distance_haversine,
        trip.distance_dummy_manhattan,
        trip.day_of_week,
        trip.avg_speed_h,
        trip.avg_speed_m
    );

    let peak_features = trip.peak_vector();
    let peak_hour = ctx.peak.predict(&peak_features)?;
    let duration_minutes = ctx.duration.predict(&trip.duration_vector())?;
    let fare = ctx.fare.predict(&trip.fare_vector(peak_hour))?;

    tracing::info!(
        "estimate zones {} -> {}: peak={} duration={:.2}min fare=${:.2}",
        req.pickup_zone,
        req.dropoff_zone,
        peak_hour,
        duration_minutes,
        fare
    );
    Ok(PredictionResult {
        peak_hour,
        duration_minutes,
        fare,
    })
}
