mod gateway;
mod service;

pub use gateway::{ChatGateway, ExplainRequest, ExplanationGateway, GatewayConfig};
pub use service::{
    EXPLANATION_EMPTY_FALLBACK, EXPLANATION_UNAVAILABLE_FALLBACK, ExplanationService,
    PendingExplanation, TIP_EMPTY_FALLBACK, TIP_UNAVAILABLE_FALLBACK,
};
