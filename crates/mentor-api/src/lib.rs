//! JSON REST API for the mentoring engine.
//!
//! Exposes an axum [`Router`] backed by any [`mentor_core::store::MentorStore`].
//! Authentication, TLS and transport concerns are the caller's
//! responsibility; see [`auth`] for the identity headers this router expects.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", mentor_api::api_router(ApiState::new(store.clone())))
//! ```

pub mod analytics;
pub mod assessments;
pub mod auth;
pub mod error;
pub mod plans;
pub mod schools;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use chrono::Duration;
use mentor_core::{
  alerts::AlertPolicy, store::MentorStore, taxonomy::Taxonomy, templates::PlanTemplates,
};

pub use error::ApiError;

/// Days a freshly minted self-assessment link stays valid by default.
pub const DEFAULT_LINK_TTL_DAYS: i64 = 14;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:     Arc<S>,
  pub taxonomy:  Arc<Taxonomy>,
  pub templates: Arc<PlanTemplates>,
  pub policy:    Arc<AlertPolicy>,
  pub link_ttl:  Duration,
}

impl<S> ApiState<S> {
  /// State with the built-in taxonomy, templates and alert policy.
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      taxonomy: Arc::new(Taxonomy::psi()),
      templates: Arc::new(PlanTemplates::builtin()),
      policy: Arc::new(AlertPolicy::default()),
      link_ttl: Duration::days(DEFAULT_LINK_TTL_DAYS),
    }
  }
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      taxonomy:  Arc::clone(&self.taxonomy),
      templates: Arc::clone(&self.templates),
      policy:    Arc::clone(&self.policy),
      link_ttl:  self.link_ttl,
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: MentorStore + 'static,
{
  Router::new()
    .route("/taxonomy", get(assessments::taxonomy::<S>))
    // Schools
    .route("/schools", get(schools::list::<S>).post(schools::create::<S>))
    .route("/schools/{id}", get(schools::get_one::<S>))
    .route(
      "/schools/{id}/assessments",
      get(assessments::list::<S>).post(assessments::create::<S>),
    )
    .route("/schools/{id}/assessment-links", post(assessments::create_link::<S>))
    .route("/schools/{id}/plans", get(plans::list::<S>))
    .route("/schools/{id}/growth", get(analytics::growth::<S>))
    .route("/schools/{id}/compare", get(analytics::comparison::<S>))
    // Assessments
    .route("/assessments/public", post(assessments::submit_public::<S>))
    .route(
      "/assessments/{id}",
      get(assessments::get_one::<S>).delete(assessments::delete_one::<S>),
    )
    .route("/assessments/{id}/suggested-actions", get(assessments::suggestions::<S>))
    .route("/assessments/{id}/plans", post(plans::create_from_assessment::<S>))
    // Plans
    .route("/plans/{id}", get(plans::get_one::<S>))
    .route("/plans/{id}/items/{item_id}", patch(plans::update_item::<S>))
    // Alerts
    .route("/alerts", get(analytics::alerts::<S>))
    .with_state(state)
}
