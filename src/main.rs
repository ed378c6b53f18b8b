use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sisfom_portal::{
    config::Config,
    models::{
        biblioteca::DocumentoQuery,
        chat::ChatRole,
        search::SearchResult,
        settings::Theme,
    },
    services::{
        search::SpotlightAction, ConsultaActions, SessionEvent,
    },
    state::PortalState,
    utils::{
        format::{file_size, initials, relative_time, truncate},
        storage::FileStore,
    },
};

const HELP: &str = "\
Comandos:
  /buscar <texto>      búsqueda global
  /ir <n>              abrir el resultado n de la última búsqueda
  /glosario <sigla>    buscar una sigla en el glosario
  /documentos [texto]  listar documentos
  /dependencias        listar dependencias
  /notificaciones      ver notificaciones no leídas
  /leer <id>           marcar una notificación como leída
  /consultas           ver mis consultas
  /nueva               nueva conversación con el asistente
  /tema <system|light|dark>
  /salir
Cualquier otro texto se envía al asistente.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    // 初始化日志（标准输出留给交互界面）
    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&config.log_level));
    if config.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    info!("Starting SISFOM portal client ({})...", config.environment);

    let storage = Arc::new(FileStore::open(&config.storage_path)?);
    let state = PortalState::new(config, storage)?;

    let user = match state.session.restore().await {
        Some(user) => user,
        None => login_from_env(&state).await?,
    };
    println!("Bienvenido, {} ({})", user.display_name(), initials(&user.display_name()));

    watch_session(&state);
    let _poller = state.notifications.mount();
    watch_arrivals(&state);

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, arg) = match line.split_once(' ') {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        let outcome = match command {
            "/salir" => break,
            "/ayuda" => {
                println!("{}", HELP);
                Ok(())
            }
            "/buscar" => buscar(&state, arg).await,
            "/ir" => ir(&state, arg).await,
            "/glosario" => glosario(&state, arg).await,
            "/documentos" => documentos(&state, arg).await,
            "/dependencias" => dependencias(&state).await,
            "/notificaciones" => {
                notificaciones(&state);
                Ok(())
            }
            "/leer" => leer(&state, arg).await,
            "/consultas" => consultas(&state).await,
            "/nueva" => {
                state.chat.new_conversation().await;
                print_last_turn(&state);
                Ok(())
            }
            "/tema" => tema(&state, arg),
            _ => {
                preguntar(&state, line).await;
                Ok(())
            }
        };

        if let Err(e) = outcome {
            println!("⚠ {}", e.user_message());
        }
    }

    info!("Shutting down SISFOM portal client");
    Ok(())
}

async fn login_from_env(state: &PortalState) -> anyhow::Result<sisfom_portal::models::user::User> {
    let username = std::env::var("SISFOM_USERNAME")
        .map_err(|_| anyhow::anyhow!("No stored session; set SISFOM_USERNAME and SISFOM_PASSWORD"))?;
    let password = std::env::var("SISFOM_PASSWORD").unwrap_or_default();

    state
        .session
        .login(&username, &password)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
}

fn watch_session(state: &PortalState) {
    let mut events = state.api.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if event == SessionEvent::Expired {
                println!("Tu sesión ha expirado. Vuelve a iniciar sesión.");
            }
        }
    });
}

fn watch_arrivals(state: &PortalState) {
    let mut arrivals = state.notifications.subscribe_arrivals();
    let settings = state.settings.clone();
    tokio::spawn(async move {
        while let Ok(notification) = arrivals.recv().await {
            let bell = if settings.notification_sound_enabled() { "\x07" } else { "" };
            println!("{}🔔 {}: {}", bell, notification.titulo, notification.mensaje);
        }
    });
}

async fn buscar(state: &PortalState, query: &str) -> sisfom_portal::Result<()> {
    let spotlight = &state.spotlight;
    spotlight.open();
    spotlight.set_query(query);

    let view = spotlight.view();
    if !view.quick_actions.is_empty() {
        println!("Búsquedas rápidas: {}", view.quick_actions.join(", "));
        return Ok(());
    }

    if tokio::time::timeout(Duration::from_secs(10), spotlight.settled())
        .await
        .is_err()
    {
        warn!("Search for {:?} did not finish in time", query);
    }

    for group in spotlight.grouped() {
        println!("{}", group.tipo.group_label());
        for entry in group.entries {
            print_result(entry.index, &entry.result);
        }
    }
    println!(
        "  [{}] Preguntar al asistente: \"{}\"",
        spotlight.results().len(),
        query
    );
    Ok(())
}

fn print_result(index: usize, result: &SearchResult) {
    let descripcion = result
        .descripcion
        .as_deref()
        .map(|d| truncate(d, 80))
        .unwrap_or_default();
    println!("  [{}] {}  {}", index, result.titulo, descripcion);
}

async fn ir(state: &PortalState, arg: &str) -> sisfom_portal::Result<()> {
    let index: usize = arg
        .parse()
        .map_err(|_| sisfom_portal::AppError::validation("Índice inválido"))?;

    match state.spotlight.select(index) {
        Some(SpotlightAction::Navigate(url)) => {
            println!("→ {}", url);
            state.chat.set_route(&url).await;
        }
        Some(SpotlightAction::AskAssistant(query)) => preguntar(state, &query).await,
        Some(SpotlightAction::Close) | None => println!("Sin resultado en esa posición"),
    }
    Ok(())
}

async fn glosario(state: &PortalState, sigla: &str) -> sisfom_portal::Result<()> {
    if let Err(e) = state.glosario.preload().await {
        warn!("Glossary preload failed: {}", e);
    }

    match state.glosario.lookup(sigla).await? {
        Some(term) => println!("{}: {}\n{}", term.siglas, term.termino, term.definicion),
        None => println!("No se encontró la sigla {}", sigla),
    }
    Ok(())
}

async fn documentos(state: &PortalState, buscar: &str) -> sisfom_portal::Result<()> {
    let query = DocumentoQuery {
        buscar: (!buscar.is_empty()).then(|| buscar.to_string()),
        ..Default::default()
    };

    for documento in state.biblioteca.documentos(&query).await? {
        let size = documento.tamano.map(file_size).unwrap_or_default();
        println!("  #{} {} {}", documento.id, documento.titulo, size);
    }
    Ok(())
}

async fn dependencias(state: &PortalState) -> sisfom_portal::Result<()> {
    for dependencia in state.biblioteca.dependencias().await? {
        println!("  {}", dependencia.option_label());
    }
    Ok(())
}

fn notificaciones(state: &PortalState) {
    let view = state.notifications.view();
    println!("{} sin leer", view.unread_count);

    let now = Utc::now();
    for n in view.items {
        let when = n.created_at.map(|d| relative_time(d, now)).unwrap_or_default();
        println!("  #{} {} ({})\n     {}", n.id, n.titulo, when, n.mensaje);
    }
}

async fn leer(state: &PortalState, arg: &str) -> sisfom_portal::Result<()> {
    let id: i64 = arg
        .parse()
        .map_err(|_| sisfom_portal::AppError::validation("Identificador inválido"))?;
    state.notifications.mark_read(id).await?;
    println!("{} sin leer", state.notifications.unread_count());
    Ok(())
}

async fn consultas(state: &PortalState) -> sisfom_portal::Result<()> {
    let viewer = state.session.user();
    if viewer.as_ref().map_or(false, |u| u.is_experto()) {
        let stats = state.consultas.estadisticas_or_default().await;
        println!(
            "Sin asignar: {}  Asignadas a mí: {}  Pendientes: {}",
            stats.sin_asignar, stats.mis_asignadas, stats.pendientes
        );
    }

    for consulta in state.consultas.mis_consultas().await? {
        let actions = ConsultaActions::for_viewer(&consulta, viewer.as_ref());
        let mut flags = Vec::new();
        if consulta.has_unread_response() {
            flags.push("nueva respuesta");
        }
        if actions.feedback {
            flags.push("pendiente de calificar");
        }
        let experto = consulta
            .experto_asignado
            .as_ref()
            .map(|e| format!(" ({})", e.display_name()))
            .unwrap_or_default();
        println!(
            "  #{} [{}] {}{} {}",
            consulta.id,
            consulta.estado.label(),
            consulta.asunto,
            experto,
            flags.join(", ")
        );
    }
    Ok(())
}

fn tema(state: &PortalState, arg: &str) -> sisfom_portal::Result<()> {
    let theme: Theme = arg.parse().map_err(sisfom_portal::AppError::Validation)?;
    state.settings.set_theme(theme)?;
    println!("Tema: {:?} (oscuro: {})", theme, state.settings.is_dark_mode());
    Ok(())
}

async fn preguntar(state: &PortalState, text: &str) {
    if !state.chat.is_open() {
        state.chat.open().await;
    }
    state.chat.set_input(text);
    if state.chat.submit().await {
        print_last_turn(state);
    }
}

fn print_last_turn(state: &PortalState) {
    if let Some(message) = state.chat.messages().last() {
        let who = match message.role {
            ChatRole::Assistant => "Asistente",
            ChatRole::User => "Tú",
        };
        println!("{}: {}", who, message.content);
    }
}
