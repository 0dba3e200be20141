//! actix-web process wiring: the WebSocket front end that bridges
//! authenticated connections into the matchmaking and match-execution
//! core. Grounded in the teacher's `rbp-server` (`crates/server/src/lib.rs`):
//! a single `Services` bundle built once at startup and handed to every
//! worker via `web::Data`, one `/health` route backed by a liveness
//! check, and a websocket-upgrade route per session.
pub mod config;
pub mod ip_gate;
pub mod presence;
pub mod rate_limit;
pub mod session;

pub use config::Config;
pub use ip_gate::IpGate;
pub use presence::Presence;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, Responder};

use tl_auth::{JwtVerifier, OriginPolicy};
use tl_core::{Elo, PlayerId};
use tl_match::MatchOrchestrator;
use tl_matchmaking::MatchmakingCoordinator;
use tl_store::{
    AuditSink, FriendGraph, IdentityProvider, InMemoryFriendGraph, InMemoryLeaderboard,
    InMemoryMatchStore, InMemoryQueueStore, InMemoryUserStore, LoggingAuditSink, UserStore,
};

/// Every collaborator the front end needs to admit a connection and hand
/// it to the core. Built once in [`Services::bootstrap`] and shared
/// across actix-web workers behind an `Arc`, mirroring how the teacher
/// shares its `Casino`/`API`/`Crypto` trio via `web::Data`.
///
/// The persistence collaborators (`user_store`, `friends`, `audit`) are
/// out of scope for the matchmaking/match-execution core (SPEC_FULL.md
/// §1) and so are wired here to in-memory test doubles rather than a
/// live Postgres/Redis adapter — a production deployment swaps these
/// for real implementations of the same trait without touching
/// `tl-match`/`tl-matchmaking`.
pub struct Services {
    pub config: Config,
    pub orchestrator: Arc<MatchOrchestrator>,
    pub matchmaking: Arc<MatchmakingCoordinator>,
    pub identity: Arc<dyn IdentityProvider>,
    pub user_store: Arc<dyn UserStore>,
    pub friends: Arc<dyn FriendGraph>,
    pub presence: Arc<Presence>,
    pub origin_policy: OriginPolicy,
}

impl Services {
    /// Wires every collaborator from `config`, including the mutually
    /// referential matchmaking ↔ orchestrator handshake (`set_matchmaking`
    /// / `set_orchestrator`) that neither side can perform at its own
    /// construction time.
    pub fn bootstrap(config: Config) -> Arc<Self> {
        let queue_store = Arc::new(InMemoryQueueStore::new());
        let user_store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
        let match_store = Arc::new(InMemoryMatchStore::new());
        let audit: Arc<dyn AuditSink> = Arc::new(LoggingAuditSink::new());
        let leaderboard = Arc::new(InMemoryLeaderboard::new());
        let friends: Arc<dyn FriendGraph> = Arc::new(InMemoryFriendGraph::new());
        let presence = Presence::new();

        let matchmaking = MatchmakingCoordinator::new(queue_store, audit.clone());
        let orchestrator = MatchOrchestrator::new(user_store.clone(), match_store, audit, leaderboard, presence.clone());
        orchestrator.set_matchmaking(matchmaking.clone());
        matchmaking.set_orchestrator(orchestrator.clone());

        let identity: Arc<dyn IdentityProvider> = Arc::new(JwtVerifier::new(config.jwt_secret.as_bytes(), config.session_ttl));
        let origin_policy = if config.allowed_origins.is_empty() {
            OriginPolicy::allow_any()
        } else {
            OriginPolicy::new(config.allowed_origins.clone())
        };

        Arc::new(Self {
            config,
            orchestrator,
            matchmaking,
            identity,
            user_store,
            friends,
            presence,
            origin_policy,
        })
    }
}

async fn health() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

/// `GET /ws?token=...`: the sole client entrypoint. Verifies the bearer
/// token, checks the connection origin, enforces one live session per
/// source IP, then bridges the upgraded socket into [`session::run`].
/// Mirrors the teacher's `hosting::handlers::enter`, but authentication
/// here is load-bearing (SPEC_FULL.md §6.1) rather than best-effort.
async fn ws_entry(
    req: HttpRequest,
    body: web::Payload,
    services: web::Data<Services>,
    ip_gate: web::Data<IpGate>,
    query: web::Query<std::collections::HashMap<String, String>>,
) -> HttpResponse {
    let origin = req.headers().get("origin").and_then(|v| v.to_str().ok());
    if services.origin_policy.check(origin).is_err() {
        return HttpResponse::Forbidden().body("origin not allowed").map_into_boxed_body();
    }

    let Some(token) = query.get("token") else {
        return HttpResponse::Unauthorized().body("missing token").map_into_boxed_body();
    };
    let player: PlayerId = match services.identity.verify(token).await {
        Ok(player) => player,
        Err(err) => return HttpResponse::Unauthorized().body(err.to_string()).map_into_boxed_body(),
    };

    let peer_ip = req
        .peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or_else(|| std::net::IpAddr::from([0, 0, 0, 0]));
    let ip_gate = ip_gate.into_inner();
    let Some(ip_lease) = ip_gate.admit(peer_ip) else {
        return HttpResponse::Conflict().body("one session per IP").map_into_boxed_body();
    };

    let record = services.user_store.get(&player).await;
    let elo: Elo = record.as_ref().map(|r| r.elo).unwrap_or(1500);
    let equipped_cursor = "default".to_string();
    let equipped_effect = None;
    let display_name = player.0.clone();

    match actix_ws::handle(&req, body) {
        Ok((response, ws_session, stream)) => {
            let services = services.into_inner();
            tokio::spawn(session::run(
                player,
                display_name,
                None,
                elo,
                equipped_cursor,
                equipped_effect,
                services,
                ws_session,
                stream,
                ip_lease,
            ));
            response.map_into_boxed_body()
        }
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()).map_into_boxed_body(),
    }
}

/// Starts the actix-web server and its background tasks (presence
/// ticker, Ctrl+C shutdown flag). Runs until the listener is closed.
pub async fn run(services: Arc<Services>) -> std::io::Result<()> {
    tl_core::shutdown_on_ctrl_c();
    services.presence.clone().spawn_ticker();

    let bind_addr = services.config.bind_addr.clone();
    let workers = services.config.workers;
    let ip_gate = IpGate::new();
    let services_data = web::Data::from(services);
    let ip_gate_data = web::Data::from(ip_gate);

    log::info!("starting typeline server on {bind_addr}");
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%r %s %Ts"))
            .wrap(Cors::default().allow_any_origin().allow_any_method().allow_any_header())
            .app_data(services_data.clone())
            .app_data(ip_gate_data.clone())
            .route("/health", web::get().to(health))
            .route("/ws", web::get().to(ws_entry))
    })
    .workers(workers)
    .bind(bind_addr)?
    .run()
    .await
}
