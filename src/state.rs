use crate::auth::google::GoogleClient;
use crate::certificates::CertificateService;
use crate::config::Config;
use crate::db::DbPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub certificates: CertificateService,
    pub google: Option<Arc<GoogleClient>>,
}
