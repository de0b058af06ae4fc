use common_http_errors::ApiError;

use crate::gateway::GatewayError;
use crate::lifecycle::LifecycleError;
use crate::pricing::PricingError;
use crate::store::StoreError;

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(what) => ApiError::bad_request_msg("conflict", format!("duplicate {what}")),
            StoreError::Database(_) | StoreError::Decode(_) => ApiError::internal(err),
        }
    }
}

impl From<PricingError> for ApiError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::ProductNotFound(id) => {
                ApiError::bad_request_msg("product_not_found", format!("product not found: {id}"))
            }
            PricingError::EmptyCart => ApiError::bad_request("empty_cart"),
            PricingError::InvalidQuantity(_) => ApiError::bad_request("invalid_quantity"),
            PricingError::Money(_) => ApiError::bad_request("invalid_amount"),
            PricingError::Store(err) => err.into(),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotConfigured => {
                ApiError::bad_gateway("gateway_not_configured", err)
            }
            GatewayError::Provider(_) | GatewayError::Transport(_) => {
                ApiError::bad_gateway("gateway_error", err)
            }
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Pricing(err) => err.into(),
            LifecycleError::Gateway(err) => err.into(),
            LifecycleError::Store(err) => err.into(),
        }
    }
}
