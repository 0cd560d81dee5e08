//! HTTP routes of the dashboard.

use crate::models::RunOutcome;
use crate::report::gallery::{kind_of, last_updated, list_charts};
use crate::server::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Local, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

type AppStateArc = Arc<AppState>;

// ============================================================================
// Dashboard
// ============================================================================

pub fn dashboard_routes() -> Router<AppStateArc> {
    Router::new().route("/", get(dashboard))
}

async fn dashboard(State(state): State<AppStateArc>) -> Html<String> {
    let graphs_dir = &state.config.paths.graphs_dir;
    Html(render_dashboard(
        &list_charts(graphs_dir),
        last_updated(graphs_dir),
    ))
}

fn render_dashboard(
    charts: &BTreeMap<String, Vec<String>>,
    updated_at: Option<DateTime<Utc>>,
) -> String {
    let updated = updated_at
        .map(|t| {
            t.with_timezone(&Local)
                .format("%d/%m/%Y %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "nunca".to_string());

    let mut body = String::new();
    if charts.is_empty() {
        body.push_str("<p class=\"vazio\">Nenhum gráfico gerado ainda. Clique em Atualizar.</p>\n");
    }
    for names in charts.values() {
        let title = names
            .first()
            .and_then(|n| kind_of(n))
            .map(|k| k.title())
            .unwrap_or("Gráficos");
        body.push_str(&format!("<section>\n<h2>{}</h2>\n<div class=\"grade\">\n", escape(title)));
        for name in names {
            let name = escape(name);
            body.push_str(&format!(
                "<figure><a href=\"/graficos/{0}\"><img src=\"/graficos/{0}\" alt=\"{0}\" loading=\"lazy\"></a><figcaption>{0}</figcaption></figure>\n",
                name
            ));
        }
        body.push_str("</div>\n</section>\n");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="utf-8">
<title>Painel de Chamados</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; background: #f7f7f7; }}
header {{ display: flex; align-items: center; gap: 1rem; }}
.grade {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(420px, 1fr)); gap: 1rem; }}
figure {{ margin: 0; background: #fff; padding: .5rem; border-radius: 4px; }}
img {{ width: 100%; }}
figcaption {{ font-size: .8rem; color: #555; }}
#status {{ color: #333; }}
</style>
</head>
<body>
<header>
<h1>Painel de Chamados</h1>
<button id="atualizar">Atualizar</button>
<span id="status">Última atualização: {updated}</span>
</header>
{body}<script>
document.getElementById("atualizar").addEventListener("click", async (ev) => {{
  const status = document.getElementById("status");
  ev.target.disabled = true;
  status.textContent = "Atualizando...";
  try {{
    const resp = await fetch("/atualizar", {{ method: "POST" }});
    const outcome = await resp.json();
    status.textContent = outcome.message;
    if (outcome.success) {{ window.location.reload(); }}
  }} catch (err) {{
    status.textContent = "Erro: " + err;
  }} finally {{
    ev.target.disabled = false;
  }}
}});
</script>
</body>
</html>
"#,
        updated = escape(&updated),
        body = body
    )
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ============================================================================
// Update
// ============================================================================

pub fn update_routes() -> Router<AppStateArc> {
    Router::new().route("/atualizar", post(update))
}

async fn update(State(state): State<AppStateArc>) -> (StatusCode, Json<RunOutcome>) {
    let guard = match state.run_lock.clone().try_lock_owned() {
        Ok(guard) => guard,
        Err(_) => {
            warn!("Update requested while a run is in progress");
            return (
                StatusCode::CONFLICT,
                Json(RunOutcome::failed("Uma atualização já está em andamento")),
            );
        }
    };

    info!("Update requested");
    let assembler = state.assembler.clone();
    // the guard moves into the task so an aborted request can't release it early
    let result = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        assembler.run()
    })
    .await;

    match result {
        Ok(outcome) if outcome.success => (StatusCode::OK, Json(outcome)),
        Ok(outcome) => (StatusCode::INTERNAL_SERVER_ERROR, Json(outcome)),
        Err(e) => {
            error!("Generation task panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RunOutcome::failed(format!("Erro ao atualizar dados: {}", e))),
            )
        }
    }
}

// ============================================================================
// Gallery
// ============================================================================

pub fn gallery_routes() -> Router<AppStateArc> {
    Router::new().route("/api/graficos", get(list_graphs))
}

async fn list_graphs(State(state): State<AppStateArc>) -> Json<BTreeMap<String, Vec<String>>> {
    Json(list_charts(&state.config.paths.graphs_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::report::chart::{ChartRenderer, ChartSpec};
    use crate::report::ReportAssembler;
    use crate::server::router;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::path::Path;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct PlaceholderRenderer;

    impl ChartRenderer for PlaceholderRenderer {
        fn render(&self, _chart: &ChartSpec<'_>, path: &Path) -> anyhow::Result<()> {
            std::fs::write(path, b"\x89PNG")?;
            Ok(())
        }
    }

    fn test_state(temp_dir: &TempDir) -> AppState {
        let mut config = Config::default();
        config.paths.data_dir = temp_dir.path().join("dados");
        config.paths.graphs_dir = temp_dir.path().join("graficos");
        std::fs::create_dir_all(&config.paths.data_dir).unwrap();
        let assembler = ReportAssembler::new(config.clone(), Box::new(PlaceholderRenderer));
        AppState::new(config, assembler)
    }

    fn write_sample(state: &AppState) {
        std::fs::write(
            state.config.paths.data_dir.join("janeiro.csv"),
            "Iniciado em;Item do Catálogo\n\
             15/01/2024 09:10;Impressora\n\
             16/01/2024 14:30;Rede\n",
        )
        .unwrap();
    }

    async fn post_update(app: Router) -> (StatusCode, RunOutcome) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/atualizar")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn get_path(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_update_success() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);
        write_sample(&state);
        let app = router(state);

        let (status, outcome) = post_update(app.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(outcome.success);
        assert_eq!(outcome.message, "Dados atualizados com sucesso!");

        let (status, body) = get_path(app.clone(), "/api/graficos").await;
        assert_eq!(status, StatusCode::OK);
        let charts: BTreeMap<String, Vec<String>> = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            charts["chamados_por_hora"],
            vec!["chamados_por_hora_janeiro.png", "chamados_por_hora_total.png"]
        );
        assert!(!charts.contains_key("avaliacoes"));

        let (status, body) = get_path(app.clone(), "/graficos/chamados_por_hora_total.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"\x89PNG");

        let (status, body) = get_path(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        let html = String::from_utf8(body).unwrap();
        assert!(html.contains("Chamados por Hora do Dia"));
        assert!(html.contains("/graficos/itens_catalogo_total.png"));
    }

    #[tokio::test]
    async fn test_update_failure_is_500() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(test_state(&temp_dir));

        let (status, outcome) = post_update(app).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!outcome.success);
        assert!(outcome.report.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_update_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);
        write_sample(&state);
        let lock = state.run_lock.clone();
        let app = router(state);

        let held = lock.clone().try_lock_owned().unwrap();
        let (status, outcome) = post_update(app.clone()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(!outcome.success);

        drop(held);
        let (status, _) = post_update(app).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_empty_gallery() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(test_state(&temp_dir));

        let (status, body) = get_path(app.clone(), "/api/graficos").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"{}");

        let (_, body) = get_path(app, "/").await;
        assert!(String::from_utf8(body).unwrap().contains("Nenhum gráfico"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a href=\"x\">&"), "&lt;a href=&quot;x&quot;&gt;&amp;");
    }
}
