//! End-to-end tests for the dispatcher and application assembly.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};

    use crate::app::{Application, Routes, SharedApp, SubApp};
    use crate::channel::{memory_channel, Inbound, Outbound, Peer, Scope};
    use crate::config::AppConfig;
    use crate::error::Error;
    use crate::http::{Headers, HttpRequest, HttpResponse, Method, StatusCode};
    use crate::routing::{Error as RouteError, Params};
    use crate::websocket::{Connection, Message, WebSocketHandler};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        email: String,
    }

    fn drain(peer: &mut Peer) -> Vec<Outbound> {
        let mut events = Vec::new();
        while let Some(event) = peer.try_next() {
            events.push(event);
        }
        events
    }

    async fn call_http(app: &SharedApp, scope: Scope, chunks: &[&str]) -> (Result<(), Error>, Vec<Outbound>) {
        let (mut peer, receive, send) = memory_channel(16);
        if chunks.is_empty() {
            peer.push(Inbound::Request {
                body: Vec::new(),
                more_body: false,
            })
            .await
            .unwrap();
        }
        for (index, chunk) in chunks.iter().enumerate() {
            peer.push(Inbound::Request {
                body: chunk.as_bytes().to_vec(),
                more_body: index + 1 < chunks.len(),
            })
            .await
            .unwrap();
        }
        let result = app.call(scope, receive, send).await;
        (result, drain(&mut peer))
    }

    fn response_of(events: Vec<Outbound>) -> (StatusCode, Headers, Vec<u8>) {
        assert_eq!(events.len(), 2, "expected start and body, got {events:?}");
        let mut events = events.into_iter();
        let (status, headers) = match events.next() {
            Some(Outbound::ResponseStart { status, headers }) => (status, headers),
            other => panic!("expected response start, got {other:?}"),
        };
        let body = match events.next() {
            Some(Outbound::ResponseBody {
                body,
                more_body: false,
            }) => body,
            other => panic!("expected final response body, got {other:?}"),
        };
        (status, headers, body)
    }

    fn sample_app(config: AppConfig) -> Application {
        let mut app = Application::new(config);
        app.route("/users/{id:int}", &[Method::GET], |_request, params| async move {
            let id = params.get_int("id").unwrap_or_default();
            Ok(HttpResponse::text(StatusCode::Ok, format!("user {id}")))
        })
        .unwrap()
        .route("/users", &[Method::POST], |request: HttpRequest, _params| async move {
            let user: User = request.json()?;
            let page = request.query_param("page").unwrap_or("1").to_string();
            Ok(HttpResponse::new(StatusCode::Created)
                .with_header("x-page", page)
                .with_json(&user)?)
        })
        .unwrap()
        .route("/echo", &[Method::PUT], |request: HttpRequest, _params| async move {
            Ok(HttpResponse::new(StatusCode::Ok).with_body_bytes(request.body))
        })
        .unwrap()
        .route("/fail", &[Method::GET], |_request, _params| async {
            Err(Error::Internal("database unavailable".to_string()))
        })
        .unwrap()
        .route("/branded", &[Method::GET], |_request, _params| async {
            Ok(HttpResponse::text(StatusCode::Ok, "branded").with_header("server", "custom"))
        })
        .unwrap();
        app
    }

    #[tokio::test]
    async fn test_routes_request_to_handler() {
        let app = sample_app(AppConfig::default()).build();
        let (result, events) = call_http(&app, Scope::http("GET", "/users/42"), &[]).await;
        result.unwrap();

        let (status, headers, body) = response_of(events);
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(body, b"user 42");
        assert_eq!(headers.get("server"), Some("microroute"));
        assert_eq!(headers.get("content-length"), Some("7"));
    }

    #[tokio::test]
    async fn test_json_body_and_query() {
        let app = sample_app(AppConfig::default()).build();
        let scope = Scope::http("post", "/users")
            .with_query_string("page=3")
            .with_header("Content-Type", "application/json");
        let (result, events) = call_http(&app, scope, &[r#"{"name":"Ada","#, r#""email":"ada@example.com"}"#]).await;
        result.unwrap();

        let (status, headers, body) = response_of(events);
        assert_eq!(status, StatusCode::Created);
        assert_eq!(headers.get("x-page"), Some("3"));
        assert_eq!(headers.get("content-type"), Some("application/json"));
        let user: User = serde_json::from_slice(&body).unwrap();
        assert_eq!(user.name, "Ada");
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let app = sample_app(AppConfig::default()).build();
        let (result, events) = call_http(&app, Scope::http("GET", "/nowhere"), &[]).await;
        result.unwrap();
        let (status, _, body) = response_of(events);
        assert_eq!(status, StatusCode::NotFound);
        assert_eq!(body, b"Not found: /nowhere");
    }

    #[tokio::test]
    async fn test_method_fallbacks() {
        let app = sample_app(AppConfig::default()).build();

        let (result, events) = call_http(&app, Scope::http("DELETE", "/users/1"), &[]).await;
        result.unwrap();
        let (status, headers, _) = response_of(events);
        assert_eq!(status, StatusCode::MethodNotAllowed);
        assert_eq!(headers.get("allow"), Some("GET, OPTIONS"));

        let (result, events) = call_http(&app, Scope::http("OPTIONS", "/users/1"), &[]).await;
        result.unwrap();
        let (status, headers, body) = response_of(events);
        assert_eq!(status, StatusCode::NoContent);
        assert_eq!(headers.get("allow"), Some("GET, OPTIONS"));
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_handler_error_becomes_500() {
        let app = sample_app(AppConfig::default()).build();
        let (result, events) = call_http(&app, Scope::http("GET", "/fail"), &[]).await;
        assert!(matches!(result, Err(Error::Internal(ref message)) if message == "database unavailable"));
        let (status, _, _) = response_of(events);
        assert_eq!(status, StatusCode::InternalServerError);
    }

    #[tokio::test]
    async fn test_chunked_body_is_accumulated() {
        let app = sample_app(AppConfig::default()).build();
        let (result, events) = call_http(&app, Scope::http("PUT", "/echo"), &["hel", "lo"]).await;
        result.unwrap();
        let (_, _, body) = response_of(events);
        assert_eq!(body, b"hello");
    }

    #[tokio::test]
    async fn test_body_limit() {
        let config = AppConfig {
            max_body_size: 8,
            ..AppConfig::default()
        };
        let app = sample_app(config).build();
        let (result, events) = call_http(&app, Scope::http("PUT", "/echo"), &["12345", "67890"]).await;
        assert!(matches!(result, Err(Error::PayloadTooLarge(8))));
        let (status, _, _) = response_of(events);
        assert_eq!(status, StatusCode::PayloadTooLarge);
    }

    #[tokio::test]
    async fn test_server_header() {
        let app = sample_app(AppConfig::default()).build();
        let (_, events) = call_http(&app, Scope::http("GET", "/branded"), &[]).await;
        let (_, headers, _) = response_of(events);
        assert_eq!(headers.get_all("server").collect::<Vec<_>>(), vec!["custom"]);

        let config = AppConfig {
            server_header: None,
            ..AppConfig::default()
        };
        let app = sample_app(config).build();
        let (_, events) = call_http(&app, Scope::http("GET", "/users/1"), &[]).await;
        let (_, headers, _) = response_of(events);
        assert!(!headers.contains("server"));
    }

    #[test]
    fn test_config_defaults_fill_partial_documents() {
        let config: AppConfig = serde_json::from_str(r#"{"name":"billing","max_body_size":10}"#).unwrap();
        assert_eq!(config.name, "billing");
        assert_eq!(config.max_body_size, 10);
        assert_eq!(config.server_header.as_deref(), Some("microroute"));

        let config: AppConfig = serde_json::from_str(r#"{"server_header":null}"#).unwrap();
        assert_eq!(config.server_header, None);
        assert_eq!(config.max_body_size, 1024 * 1024);
    }

    fn ping_subapp(prefix: &str) -> SubApp {
        let mut sub = SubApp::new(prefix);
        sub.route("/ping", &[Method::GET], |_request, _params| async {
            Ok(HttpResponse::text(StatusCode::Ok, "pong"))
        })
        .unwrap();
        sub
    }

    #[tokio::test]
    async fn test_nested_subapps() {
        let mut api = SubApp::new("/api");
        api.mount(ping_subapp("/v1")).unwrap();
        api.route("/items/{name}", &[Method::GET], |_request, params| async move {
            let name = params.get_str("name").unwrap_or_default().to_string();
            Ok(HttpResponse::text(StatusCode::Ok, name))
        })
        .unwrap();

        let mut app = Application::default();
        app.mount(api).unwrap();
        let paths: Vec<String> = app.router().routes().into_iter().map(|route| route.path).collect();
        assert_eq!(paths, vec!["/api/items/{name:str}", "/api/v1/ping"]);

        let app = app.build();
        let (_, events) = call_http(&app, Scope::http("GET", "/api/v1/ping"), &[]).await;
        assert_eq!(response_of(events).2, b"pong");
        let (_, events) = call_http(&app, Scope::http("GET", "/api/items/box"), &[]).await;
        assert_eq!(response_of(events).2, b"box");
    }

    #[test]
    fn test_mount_conflict() {
        let mut app = Application::default();
        app.route("/v1/ping", &[Method::GET], |_request, _params| async {
            Ok(HttpResponse::text(StatusCode::Ok, "mine"))
        })
        .unwrap();
        assert_eq!(
            app.mount(ping_subapp("/v1")).err(),
            Some(RouteError::EndpointConflict("/v1/ping".to_string()))
        );
    }

    #[test]
    fn test_registration_errors_surface() {
        let mut app = Application::default();
        assert!(matches!(
            app.route("/a/{id:uuid}", &[Method::GET], |_request, _params| async {
                Ok(HttpResponse::empty(StatusCode::NoContent))
            }),
            Err(RouteError::UnknownCast(_))
        ));

        app.route("/a", &[Method::GET], |_request, _params| async {
            Ok(HttpResponse::empty(StatusCode::NoContent))
        })
        .unwrap();
        assert!(matches!(
            app.route("/a", &[Method::GET, Method::HEAD], |_request, _params| async {
                Ok(HttpResponse::empty(StatusCode::NoContent))
            }),
            Err(RouteError::DuplicateMethod { .. })
        ));
    }

    #[test]
    fn test_url_for() {
        let app = sample_app(AppConfig::default());
        let params: Params = [("id", 7i64)].into_iter().collect();
        assert_eq!(app.url_for("/users/{id:int}", &params).unwrap(), "/users/7");
    }

    async fn open_socket(app: &SharedApp, path: &str, inbound: Vec<Inbound>) -> (Result<(), Error>, Vec<Outbound>) {
        let (mut peer, receive, send) = memory_channel(16);
        for event in inbound {
            peer.push(event).await.unwrap();
        }
        let result = app.call(Scope::websocket(path), receive, send).await;
        (result, drain(&mut peer))
    }

    #[tokio::test]
    async fn test_websocket_route() {
        let mut app = Application::default();
        app.websocket("/rooms/{room}", |connection: Connection, params: Params| async move {
            connection.accept(None).await?;
            let room = params.get_str("room").unwrap_or_default().to_string();
            let text = connection.receive_text().await?;
            connection.send_text(format!("{room}: {text}")).await?;
            connection.close(1000, "").await?;
            Ok(())
        })
        .unwrap();
        let app = app.build();

        let inbound = vec![Inbound::Connect, Inbound::Receive(Message::Text("hello".to_string()))];
        let (result, events) = open_socket(&app, "/rooms/lobby", inbound).await;
        result.unwrap();
        assert_eq!(
            events,
            vec![
                Outbound::Accept { subprotocol: None },
                Outbound::Send(Message::Text("lobby: hello".to_string())),
                Outbound::Close {
                    code: 1000,
                    reason: String::new()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_websocket_refusals() {
        let app = sample_app(AppConfig::default()).build();

        let (result, events) = open_socket(&app, "/missing", vec![Inbound::Connect]).await;
        result.unwrap();
        let (status, _, _) = response_of(events);
        assert_eq!(status, StatusCode::NotFound);

        let (result, events) = open_socket(&app, "/users/1", vec![Inbound::Connect]).await;
        result.unwrap();
        let (status, _, _) = response_of(events);
        assert_eq!(status, StatusCode::Forbidden);
    }

    #[tokio::test]
    async fn test_websocket_protocol_error_is_isolated() {
        let mut app = Application::default();
        app.websocket("/ws", |connection: Connection, _params: Params| async move {
            connection.send_text("too early").await?;
            Ok(())
        })
        .unwrap();
        let app = app.build();

        let (result, events) = open_socket(&app, "/ws", vec![Inbound::Connect]).await;
        assert!(matches!(result, Err(Error::Connection(_))));
        assert!(events.is_empty());
    }

    struct Shout;

    #[async_trait]
    impl WebSocketHandler for Shout {
        async fn on_message(&mut self, connection: &Connection, message: Message) -> Result<(), Error> {
            let text = message.as_text().unwrap_or_default().to_uppercase();
            connection.send_text(text).await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_session_route_in_subapp() {
        let mut chat = SubApp::new("/chat");
        chat.session("/shout", || Shout).unwrap();
        let mut app = Application::default();
        app.mount(chat).unwrap();
        let routes = app.router().routes();
        assert!(routes[0].websocket);
        let app = app.build();

        let inbound = vec![
            Inbound::Connect,
            Inbound::Receive(Message::Text("hey".to_string())),
            Inbound::Disconnect { code: 1001 },
        ];
        let (result, events) = open_socket(&app, "/chat/shout", inbound).await;
        result.unwrap();
        assert_eq!(
            events,
            vec![
                Outbound::Accept { subprotocol: None },
                Outbound::Send(Message::Text("HEY".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn test_http_and_stream_share_endpoint() {
        let mut app = Application::default();
        app.route("/live", &[Method::GET], |_request, _params| async {
            Ok(HttpResponse::text(StatusCode::Ok, "use a socket"))
        })
        .unwrap()
        .session("/live", || Shout)
        .unwrap();
        let routes = app.router().routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].methods, vec![Method::GET]);
        assert!(routes[0].websocket);

        let app = app.build();
        let (_, events) = call_http(&app, Scope::http("GET", "/live"), &[]).await;
        assert_eq!(response_of(events).0, StatusCode::Ok);
    }
}
