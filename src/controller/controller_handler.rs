use crate::configuration::config::Config;
use crate::data_capture::recorder::Recorder;
use crate::data_capture::scheduler::Scheduler;
use crate::error_handling::types::*;
use crate::management::transport::ManagementTransport;
use crate::session_management::session_manager::SessionManager;
use crate::storage::database_storage::DatabaseStorage;
use crate::web_interface::web_server::WebServer;
use log::{error, info, warn};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Long-lived components wired from one configuration.
pub struct Services {
    pub recorder: Arc<Recorder>,
    pub session_manager: Arc<SessionManager>,
}

pub struct Controller {
    pub config: Config,
}

impl Controller {
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        config.validate().map_err(|e| {
            error!("Refusing invalid configuration: {}", e);
            ControllerError::ConfigurationError(e)
        })?;
        Ok(Self { config })
    }

    /// Opens the store and builds the transport, recorder and session manager on top.
    pub async fn build(&self) -> Result<Services, ControllerError> {
        let storage = Arc::new(
            DatabaseStorage::open(&self.config.storage.database_path)
                .await
                .map_err(ControllerError::StorageError)?,
        );
        let transport = Arc::new(ManagementTransport::new(&self.config.management));
        info!("Management interface at {}", transport.endpoint());

        let recorder = Arc::new(Recorder::new(transport.clone(), storage.clone()));
        let session_manager = Arc::new(SessionManager::new(
            transport,
            storage,
            recorder.clone(),
        ));

        Ok(Services {
            recorder,
            session_manager,
        })
    }

    /// Runs until Ctrl-C.
    pub async fn run(&self) -> Result<(), ControllerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for Ctrl-C: {}", e);
            }
        })
        .await
    }

    /// Starts the scheduler and the web server, then shuts both down once `shutdown`
    /// resolves.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), ControllerError>
    where
        F: Future<Output = ()>,
    {
        let services = self.build().await?;

        let mut scheduler = Scheduler::new(
            services.recorder.clone(),
            self.config.recorder.poll_interval(),
        );
        scheduler.start();

        let web_task = match self.spawn_web(&services).await {
            Ok(task) => task,
            Err(e) => {
                scheduler.stop().await;
                return Err(e);
            }
        };

        shutdown.await;
        info!("Shutdown requested");
        self.shutdown(scheduler, web_task).await;
        Ok(())
    }

    /// Binds before spawning so a bad address or a taken port fails startup.
    async fn spawn_web(
        &self,
        services: &Services,
    ) -> Result<Option<JoinHandle<()>>, ControllerError> {
        let web = &self.config.web;
        if !web.enabled {
            info!("Web interface disabled");
            return Ok(None);
        }
        let listener = WebServer::bind(&web.bind_address, web.port)
            .await
            .map_err(ControllerError::WebError)?;

        let server = WebServer::new(services.session_manager.clone());
        Ok(Some(tokio::spawn(async move { server.serve(listener).await })))
    }

    async fn shutdown(&self, mut scheduler: Scheduler, web_task: Option<JoinHandle<()>>) {
        scheduler.stop().await;
        if let Some(task) = web_task {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Web task ended abnormally: {}", e);
                }
            }
        }
        info!(
            "Stopped after {} recording cycle(s), {} tick(s) skipped",
            scheduler.started_cycles(),
            scheduler.skipped_ticks()
        );
    }
}
