use async_std::sync::Arc;
use handlebars::Handlebars;
use log::*;

mod api_models;
mod config;
mod error;
mod identity;
mod models;
mod routes;
mod store;
mod tally;
mod voting;

use config::Settings;
use identity::{ForwardedFor, VoterSource};
use store::{MemoryStore, PgStore, PollStore};

/**
 * Struct for carrying application state into tide request handlers
 */
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PollStore>,
    pub voters: Arc<dyn VoterSource>,
    pub templates: Arc<Handlebars<'static>>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PollStore>,
        settings: &Settings,
    ) -> Result<Self, handlebars::TemplateFileError> {
        let mut templates = Handlebars::new();
        templates.register_templates_directory(".hbs", &settings.template_dir)?;

        Ok(Self {
            store,
            voters: Arc::new(ForwardedFor),
            templates: Arc::new(templates),
            settings: Arc::new(settings.clone()),
        })
    }
}

/**
 * Pick the PostgreSQL store when a database is configured, otherwise keep polls in memory
 */
async fn create_store(settings: &Settings) -> Result<Arc<dyn PollStore>, sqlx::Error> {
    match &settings.database_url {
        Some(url) => Ok(Arc::new(PgStore::connect(url).await?)),
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

pub fn build_app(state: AppState) -> tide::Server<AppState> {
    let mut app = tide::with_state(state);
    app.with(driftwood::ApacheCombinedLogger);

    app.at("/").get(routes::index);
    app.at("/polls").get(routes::polls::list);
    app.at("/new")
        .get(routes::polls::new_form)
        .post(routes::polls::create);
    app.at("/view/:id")
        .get(routes::polls::view)
        .post(routes::polls::vote);
    app.at("/delete/:id").get(routes::polls::delete);

    app.at("/api/v1/polls").put(routes::api::create);
    app.at("/api/v1/polls/:id").get(routes::api::get);
    app.at("/api/v1/polls/:id/vote").post(routes::api::vote);
    app.at("/api/v1/polls/:id/results").get(routes::api::results);
    app
}

#[async_std::main]
async fn main() -> Result<(), std::io::Error> {
    pretty_env_logger::init();
    let settings = Settings::from_env();

    let store = match create_store(&settings).await {
        Ok(store) => store,
        Err(err) => {
            error!("Could not initialize the poll store! {:?}", err);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, err));
        }
    };

    let state = match AppState::new(store, &settings) {
        Ok(state) => state,
        Err(err) => {
            error!("Could not load templates from {}: {:?}", settings.template_dir, err);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, err));
        }
    };

    info!("Listening on {}", settings.listen_addr);
    build_app(state).listen(settings.listen_addr.clone()).await?;
    Ok(())
}
