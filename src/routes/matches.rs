use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;

use crate::core::{
    fitness_vector, AggregationParams, MatchError, MatchingPipeline, RankAggregator, StableMatcher,
};
use crate::models::{
    AggregateRequest, AggregateResponse, CreateMatchRequest, ErrorResponse, HealthResponse,
    MatchResponse, MatchingInput, StabilityRequest,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: MatchingPipeline,
}

/// Configure all matching routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/aggregate", web::post().to(aggregate))
        .route("/match", web::post().to(create_match))
        .route("/stability", web::post().to(check_stability))
        .route("/pipeline", web::post().to(run_pipeline));
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Map a core error to an HTTP response
///
/// Input problems are the caller's to fix (422); non-convergence means the
/// matcher itself misbehaved (500).
pub fn error_response(err: &MatchError) -> HttpResponse {
    let status = match err {
        MatchError::ConstraintViolation { .. } | MatchError::ShapeMismatch { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        MatchError::NonConvergence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    HttpResponse::build(status).json(ErrorResponse {
        error: err.kind().to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
    })
}

fn validation_failed(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

fn blocking_failed(err: impl std::fmt::Display) -> HttpResponse {
    tracing::error!("Blocking task failed: {}", err);
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: "internal_error".to_string(),
        message: err.to_string(),
        status_code: 500,
    })
}

/// Aggregate endpoint
///
/// POST /api/v1/aggregate
///
/// Request body:
/// ```json
/// {
///   "candidates": [0, 1, 2],
///   "subjective": [2, 1, 0],
///   "fitness": [8, 9, 7],
///   "preferenceWeight": 1.0,
///   "fitnessWeight": 1.0,
///   "fitnessMode": "ordinal"
/// }
/// ```
async fn aggregate(
    state: web::Data<AppState>,
    req: web::Json<AggregateRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for aggregate request: {}", errors);
        return validation_failed(errors);
    }

    let req = req.into_inner();
    let defaults = state.pipeline.aggregator().params();

    let aggregator = match RankAggregator::new(AggregationParams {
        preference_weight: req.preference_weight.unwrap_or(defaults.preference_weight),
        fitness_weight: req.fitness_weight.unwrap_or(defaults.fitness_weight),
        fitness_mode: req.fitness_mode.unwrap_or(defaults.fitness_mode),
        max_candidates: defaults.max_candidates,
    }) {
        Ok(aggregator) => aggregator,
        Err(e) => return error_response(&e),
    };

    tracing::info!(
        "Aggregating {} candidates ({} mode)",
        req.candidates.len(),
        aggregator.params().fitness_mode
    );

    let result = web::block(move || {
        let fitness = fitness_vector(&req.candidates, &req.fitness)?;
        aggregator.aggregate(&req.subjective, &fitness, &req.candidates)
    })
    .await;

    match result {
        Ok(Ok(aggregation)) => HttpResponse::Ok().json(AggregateResponse {
            request_id: uuid::Uuid::new_v4().to_string(),
            aggregation,
        }),
        Ok(Err(e)) => {
            tracing::info!("Aggregation rejected: {}", e);
            error_response(&e)
        }
        Err(e) => blocking_failed(e),
    }
}

/// Match endpoint
///
/// POST /api/v1/match
///
/// Runs deferred acceptance on consensus rankings and returns the outcome
/// together with its stability check.
async fn create_match(
    state: web::Data<AppState>,
    req: web::Json<CreateMatchRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let req = req.into_inner();
    let gate = *state.pipeline.gate();
    let matcher = *state.pipeline.matcher();

    let result = web::block(move || {
        gate.check_participant_counts(&req.recipients, &req.providers)?;
        let outcome = matcher.create_match(
            &req.recipients,
            &req.providers,
            &req.recipient_rankings,
            &req.provider_rankings,
            &req.capacities,
        )?;
        let stability = StableMatcher::is_stable(
            &outcome.matching,
            &req.recipient_rankings,
            &req.provider_rankings,
            &req.capacities,
        );
        Ok::<_, MatchError>((outcome, stability))
    })
    .await;

    match result {
        Ok(Ok((outcome, stability))) => HttpResponse::Ok().json(MatchResponse {
            request_id: uuid::Uuid::new_v4().to_string(),
            outcome,
            stability,
        }),
        Ok(Err(e)) => error_response(&e),
        Err(e) => blocking_failed(e),
    }
}

/// Stability endpoint
///
/// POST /api/v1/stability
async fn check_stability(req: web::Json<StabilityRequest>) -> impl Responder {
    let report = StableMatcher::is_stable(
        &req.matching,
        &req.recipient_rankings,
        &req.provider_rankings,
        &req.capacities,
    );

    HttpResponse::Ok().json(report)
}

/// Full pipeline endpoint
///
/// POST /api/v1/pipeline
///
/// Validates raw preferences and fitness for both populations, aggregates
/// them and runs the matching.
async fn run_pipeline(
    state: web::Data<AppState>,
    req: web::Json<MatchingInput>,
) -> impl Responder {
    let pipeline = state.pipeline;
    let input = req.into_inner();

    match web::block(move || pipeline.run(&input)).await {
        Ok(Ok(outcome)) => HttpResponse::Ok().json(outcome),
        Ok(Err(e)) => {
            tracing::info!("Pipeline rejected input: {}", e);
            error_response(&e)
        }
        Err(e) => blocking_failed(e),
    }
}
