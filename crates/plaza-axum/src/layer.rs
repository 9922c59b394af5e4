//! Feature gate middleware
//!
//! Composes the three steps of gating a metered route: the entitlement
//! check runs before the handler, denials short-circuit into typed JSON
//! responses, and usage is recorded only when the response status is 2xx.
//! The action result is the response value itself; there is no wrapped
//! send hook.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use tower::{Layer, Service};

use plaza_db::{AddOnRepository, SubscriptionRepository, UsageRepository};
use plaza_entitlement_core::{EntitlementGuard, UsageEvent, UsageRecorder};
use plaza_types::{Decision, Feature};

use crate::error::GateError;
use crate::extractors::caller_id_from_headers;

/// Tower layer gating a route on one metered or capability feature.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .route("/services", post(create_service))
///     .route_layer(FeatureGateLayer::new(guard, recorder, Feature::Services));
/// ```
pub struct FeatureGateLayer<Sub, Us, Ad> {
    guard: EntitlementGuard<Sub, Us, Ad>,
    recorder: UsageRecorder,
    feature: Feature,
    amount: i64,
}

impl<Sub, Us, Ad> FeatureGateLayer<Sub, Us, Ad> {
    /// Gate on one unit of the feature per request.
    pub fn new(
        guard: EntitlementGuard<Sub, Us, Ad>,
        recorder: UsageRecorder,
        feature: Feature,
    ) -> Self {
        Self {
            guard,
            recorder,
            feature,
            amount: 1,
        }
    }

    /// Gate on a different per-request amount.
    pub fn with_amount(mut self, amount: i64) -> Self {
        self.amount = amount;
        self
    }
}

impl<Sub, Us, Ad> Clone for FeatureGateLayer<Sub, Us, Ad> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
            recorder: self.recorder.clone(),
            feature: self.feature,
            amount: self.amount,
        }
    }
}

impl<S, Sub, Us, Ad> Layer<S> for FeatureGateLayer<Sub, Us, Ad> {
    type Service = FeatureGateService<S, Sub, Us, Ad>;

    fn layer(&self, inner: S) -> Self::Service {
        FeatureGateService {
            inner,
            guard: self.guard.clone(),
            recorder: self.recorder.clone(),
            feature: self.feature,
            amount: self.amount,
        }
    }
}

/// The feature gate service.
pub struct FeatureGateService<S, Sub, Us, Ad> {
    inner: S,
    guard: EntitlementGuard<Sub, Us, Ad>,
    recorder: UsageRecorder,
    feature: Feature,
    amount: i64,
}

impl<S: Clone, Sub, Us, Ad> Clone for FeatureGateService<S, Sub, Us, Ad> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            guard: self.guard.clone(),
            recorder: self.recorder.clone(),
            feature: self.feature,
            amount: self.amount,
        }
    }
}

impl<S, Sub, Us, Ad> Service<Request<Body>> for FeatureGateService<S, Sub, Us, Ad>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send,
    Sub: SubscriptionRepository + 'static,
    Us: UsageRepository + 'static,
    Ad: AddOnRepository + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Take the ready service, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let guard = self.guard.clone();
        let recorder = self.recorder.clone();
        let feature = self.feature;
        let amount = self.amount;

        Box::pin(async move {
            let user_id = match caller_id_from_headers(req.headers()) {
                Ok(id) => id,
                Err(err) => return Ok(err.into_response()),
            };

            match guard.check_with(user_id, feature, amount).await {
                Ok(Decision::Allowed) => {}
                Ok(denied) => {
                    metrics::counter!(
                        "entitlement_denials_total",
                        "feature" => feature.as_str(),
                        "reason" => denied.reason_code()
                    )
                    .increment(1);
                    tracing::debug!(
                        user_id = %user_id,
                        feature = %feature,
                        reason = denied.reason_code(),
                        "request denied by entitlement gate"
                    );
                    return Ok(GateError::Denied(denied).into_response());
                }
                Err(err) => return Ok(GateError::from(err).into_response()),
            }

            let response = inner.call(req).await?;

            // The gated action consumes budget only once it has succeeded.
            if response.status().is_success() {
                recorder.record(UsageEvent::new(user_id, feature, amount));
                metrics::counter!(
                    "entitlement_usage_tracked_total",
                    "feature" => feature.as_str()
                )
                .increment(1);
            }

            Ok(response)
        })
    }
}
