use cognisphere::CogniSphere;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub system: Arc<CogniSphere>,
}
