use std::sync::Arc;

use crate::application::access::AccessPolicy;
use crate::application::query::{FilmService, GenreService, PersonService};
use crate::application::repos::{CacheStore, IndexClient};

/// Shared handles for the catalog API, built once at startup.
#[derive(Clone)]
pub struct CatalogState {
    pub films: Arc<FilmService>,
    pub genres: Arc<GenreService>,
    pub persons: Arc<PersonService>,
    pub index: Arc<dyn IndexClient>,
    pub cache: Option<Arc<dyn CacheStore>>,
    pub access: Arc<dyn AccessPolicy>,
}
