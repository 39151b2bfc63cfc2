//! A basic application demonstrating routing, sub-apps and middleware.
//!
//! There is no network listener here: requests are fed through an in-memory
//! channel, the same way a host server would hand them to the application.

use log::info;
use microroute::{
    memory_channel, AccessLog, Application, Connection, HttpRequest, HttpResponse, Inbound, Method, Outbound,
    Params, Routes, Scope, SharedApp, StatusCode, SubApp,
};

async fn request(app: &SharedApp, method: &str, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (mut peer, receive, send) = memory_channel(8);
    peer.push(Inbound::Request {
        body: Vec::new(),
        more_body: false,
    })
    .await?;
    let (path, query) = path.split_once('?').unwrap_or((path, ""));
    app.call(Scope::http(method, path).with_query_string(query), receive, send)
        .await?;

    while let Some(event) = peer.try_next() {
        match event {
            Outbound::ResponseStart { status, headers } => {
                info!("{method} {path} -> {} {}", status.as_u16(), status.reason_phrase());
                for (name, value) in headers.iter() {
                    info!("  {name}: {value}");
                }
            }
            Outbound::ResponseBody { body, .. } if !body.is_empty() => {
                info!("  body: {}", String::from_utf8_lossy(&body));
            }
            _ => {}
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the logger
    env_logger::init();

    let mut app = Application::default();

    app.route("/", &[Method::GET], |_request: HttpRequest, _params: Params| async move {
        Ok(HttpResponse::text(StatusCode::Ok, "Hello, World!"))
    })?;

    app.route("/hello", &[Method::GET], |request: HttpRequest, _params: Params| async move {
        let name = request.query_param("name").unwrap_or("World").to_string();
        Ok(HttpResponse::text(StatusCode::Ok, format!("Hello, {name}!")))
    })?;

    let mut api = SubApp::new("/api");
    api.route("/users/{id:int}", &[Method::GET], |_request: HttpRequest, params: Params| async move {
        let id = params.get_int("id").unwrap_or_default();
        HttpResponse::new(StatusCode::Ok).with_json(&serde_json::json!({ "id": id }))
    })?;
    api.websocket("/echo", |connection: Connection, _params: Params| async move {
        connection.accept(None).await?;
        let text = connection.receive_text().await?;
        connection.send_text(text).await?;
        connection.close(1000, "").await?;
        Ok(())
    })?;
    app.mount(api)?;

    app.layer(AccessLog);
    let app = app.build();

    request(&app, "GET", "/").await?;
    request(&app, "GET", "/hello?name=Ferris").await?;
    request(&app, "GET", "/api/users/42").await?;
    request(&app, "OPTIONS", "/api/users/42").await?;
    request(&app, "DELETE", "/api/users/42").await?;
    request(&app, "GET", "/missing").await?;

    let (mut peer, receive, send) = memory_channel(8);
    peer.push(Inbound::Connect).await?;
    peer.push(Inbound::Receive(microroute::Message::Text("ping".to_string())))
        .await?;
    app.call(Scope::websocket("/api/echo"), receive, send).await?;
    while let Some(event) = peer.try_next() {
        info!("websocket event: {event:?}");
    }

    Ok(())
}
