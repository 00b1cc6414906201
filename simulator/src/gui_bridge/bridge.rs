use crate::gui_bridge::model::DashboardModel;
use crate::workflow::runner::Runner;
use anyhow::{Context, Result};
use serde_json::json;
use std::{convert::Infallible, net::SocketAddr, sync::Arc};
use tokio::{sync::oneshot, task::JoinHandle};
use warp::{http::StatusCode, Filter, Rejection, Reply};

pub fn gui_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

fn with_runner(
    runner: Arc<Runner>,
) -> impl Filter<Extract = (Arc<Runner>,), Error = Infallible> + Clone {
    warp::any().map(move || runner.clone())
}

/// Dashboard routes over the shared runner.
pub fn routes(
    runner: Arc<Runner>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let snapshot = warp::path("snapshot")
        .and(warp::get())
        .and(with_runner(runner.clone()))
        .map(|runner: Arc<Runner>| warp::reply::json(&DashboardModel::capture(&runner)));

    let statistics = warp::path("statistics")
        .and(warp::get())
        .and(with_runner(runner.clone()))
        .map(|runner: Arc<Runner>| warp::reply::json(&runner.matcher().get_statistics()));

    let export = warp::path("export")
        .and(warp::get())
        .and(with_runner(runner.clone()))
        .map(|runner: Arc<Runner>| warp::reply::json(&runner.matcher().export()));

    let attendance = warp::path("attendance")
        .and(warp::get())
        .and(with_runner(runner.clone()))
        .map(|runner: Arc<Runner>| warp::reply::json(&runner.report()));

    let ingest = warp::path("ingest")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_runner(runner.clone()))
        .map(|names: Vec<String>, runner: Arc<Runner>| {
            let tick = runner.ingest(&names);
            warp::reply::with_status(warp::reply::json(&tick), StatusCode::OK)
        });

    let reset = warp::path("reset")
        .and(warp::post())
        .and(with_runner(runner))
        .map(|runner: Arc<Runner>| {
            runner.reset();
            warp::reply::json(&json!({"status": "ok"}))
        });

    snapshot
        .or(statistics)
        .or(export)
        .or(attendance)
        .or(ingest)
        .or(reset)
}

/// HTTP endpoint that exposes the live session to dashboard clients.
pub struct GuiBridge {
    address: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    server: JoinHandle<()>,
}

impl GuiBridge {
    /// Binds `address` and serves on the current tokio runtime.
    pub fn start(runner: Arc<Runner>, address: SocketAddr) -> Result<Self> {
        let (shutdown, signal) = oneshot::channel::<()>();
        let (address, server) = warp::serve(routes(runner))
            .try_bind_with_graceful_shutdown(address, async move {
                let _ = signal.await;
            })
            .with_context(|| format!("binding dashboard bridge on {}", address))?;

        let bridge = Self {
            address,
            shutdown: Some(shutdown),
            server: tokio::spawn(server),
        };
        bridge.publish_status(&format!("listening on http://{}", address));
        Ok(bridge)
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn publish_status(&self, message: &str) {
        println!("[bridge] {}", message);
    }

    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.server.await.context("joining dashboard bridge")?;
        Ok(())
    }
}
