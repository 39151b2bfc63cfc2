//! Tests for the path router and casts.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::endpoint::{Endpoint, FnHandler, HttpHandler};
    use crate::error::Error as AppError;
    use crate::http::{HttpRequest, HttpResponse, Method, StatusCode};
    use crate::routing::{
        parse_path, parse_segment, split_path, Cast, CastRegistry, Error, Params, Router, Segment, Value,
    };

    fn ok_handler(body: &'static str) -> Arc<dyn HttpHandler> {
        Arc::new(FnHandler(move |_request: HttpRequest, _params: Params| async move {
            Ok::<_, AppError>(HttpResponse::text(StatusCode::Ok, body))
        }))
    }

    fn router_with(paths: &[&str]) -> Router {
        let mut router = Router::new();
        for path in paths {
            router.endpoint_mut(path).unwrap();
        }
        router
    }

    fn matched_path(router: &Router, path: &str) -> Option<String> {
        router
            .match_path(path)
            .map(|matched| matched.endpoint.path().to_string())
    }

    #[derive(Debug, PartialEq)]
    struct Version {
        major: u32,
        minor: u32,
    }

    struct VersionCast;

    impl Cast for VersionCast {
        fn pattern(&self) -> &str {
            r"v[0-9]+\.[0-9]+"
        }

        fn parse(&self, segment: &str) -> Option<Value> {
            let (major, minor) = segment.strip_prefix('v')?.split_once('.')?;
            Some(Value::custom(Version {
                major: major.parse().ok()?,
                minor: minor.parse().ok()?,
            }))
        }

        fn serialize(&self, value: &Value) -> Option<String> {
            let version = value.downcast_ref::<Version>()?;
            Some(format!("v{}.{}", version.major, version.minor))
        }
    }

    #[test]
    fn test_split_path() {
        assert!(split_path("").is_empty());
        assert!(split_path("/").is_empty());
        assert_eq!(split_path("/a/b"), vec!["a", "b"]);
        assert_eq!(split_path("a/b/"), vec!["a", "b", ""]);
    }

    #[test]
    fn test_parse_segment() {
        assert_eq!(parse_segment("/x", "users").unwrap(), Segment::Literal("users"));
        assert_eq!(
            parse_segment("/x", "{id}").unwrap(),
            Segment::Variable { binding: "id", cast: "str" }
        );
        assert_eq!(
            parse_segment("/x", "{id:int}").unwrap(),
            Segment::Variable { binding: "id", cast: "int" }
        );
    }

    #[test]
    fn test_invalid_paths_are_rejected() {
        for path in ["/a/{b", "/a/b}", "/a/{b:int:x}", "/a/{}", "/a/{b:}", "/a/{:int}", "/a/{{b}}", "/a/x{b}"] {
            let mut router = Router::new();
            assert!(
                matches!(router.endpoint_mut(path), Err(Error::InvalidPath { .. })),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn test_duplicate_binding_in_one_path() {
        assert_eq!(
            parse_path("/a/{x}/b/{x:int}").unwrap_err(),
            Error::DuplicateBinding {
                path: "/a/{x}/b/{x:int}".to_string(),
                binding: "x".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_cast() {
        let mut router = Router::new();
        assert_eq!(
            router.endpoint_mut("/files/{name:path}").unwrap_err(),
            Error::UnknownCast("path".to_string())
        );
        assert!(router.routes().is_empty());
    }

    #[test]
    fn test_literal_paths_match_exactly_with_empty_params() {
        let paths = ["/", "/about", "/users/list", "/a/b/c/d"];
        let router = router_with(&paths);
        for path in paths {
            let matched = router.match_path(path).unwrap();
            assert_eq!(matched.endpoint.path(), path);
            assert!(matched.params.is_empty());
        }
        assert!(router.match_path("/users").is_none());
        assert!(router.match_path("/users/list/more").is_none());
    }

    #[test]
    fn test_empty_path_is_root() {
        let router = router_with(&[""]);
        assert!(router.match_path("/").is_some());
        assert!(router.match_path("").is_some());
    }

    #[test]
    fn test_int_segments() {
        let router = router_with(&["/items/{id:int}"]);
        for (segment, expected) in [("0", 0), ("42", 42), ("-5", -5), ("+7", 7), ("007", 7)] {
            let matched = router.match_path(&format!("/items/{segment}")).unwrap();
            assert_eq!(matched.params.get_int("id"), Some(expected));
        }
        for segment in ["abc", "1.5", "4a", "-", "99999999999999999999"] {
            assert!(router.match_path(&format!("/items/{segment}")).is_none(), "{segment}");
        }
    }

    #[test]
    fn test_literal_wins_over_variable() {
        for order in [["/user/profile", "/user/{id}"], ["/user/{id}", "/user/profile"]] {
            let router = router_with(&order);
            let matched = router.match_path("/user/profile").unwrap();
            assert_eq!(matched.endpoint.path(), "/user/profile");
            assert!(matched.params.is_empty());

            let matched = router.match_path("/user/jane").unwrap();
            assert_eq!(matched.endpoint.path(), "/user/{id}");
            assert_eq!(matched.params.get_str("id"), Some("jane"));
        }
    }

    #[test]
    fn test_variable_children_in_registration_order() {
        let router = router_with(&["/v/{number:int}", "/v/{name}"]);
        assert_eq!(matched_path(&router, "/v/5").as_deref(), Some("/v/{number:int}"));
        assert_eq!(matched_path(&router, "/v/five").as_deref(), Some("/v/{name}"));

        let router = router_with(&["/v/{name}", "/v/{number:int}"]);
        assert_eq!(matched_path(&router, "/v/5").as_deref(), Some("/v/{name}"));
    }

    #[test]
    fn test_match_backtracks_to_variable_sibling() {
        let router = router_with(&["/files/latest/meta", "/files/{name}/raw"]);
        let matched = router.match_path("/files/latest/raw").unwrap();
        assert_eq!(matched.endpoint.path(), "/files/{name}/raw");
        assert_eq!(matched.params.len(), 1);
        assert_eq!(matched.params.get_str("name"), Some("latest"));
    }

    #[test]
    fn test_mixed_cast_scenario() {
        let router = router_with(&["/abcd/{efg:bool}/hij/{klm:str}/nop/{qrst:int}"]);
        let matched = router.match_path("/abcd/false/hij/anything/nop/1234").unwrap();

        let expected: Params = [
            ("efg", Value::Bool(false)),
            ("klm", Value::from("anything")),
            ("qrst", Value::Int(1234)),
        ]
        .into_iter()
        .collect();
        assert_eq!(matched.params, expected);

        assert!(router.match_path("/abcd/False/hij/anything/nop/1234").is_none());
    }

    #[test]
    fn test_binding_conflict_at_same_level() {
        let mut router = router_with(&["/a/{id:int}"]);
        assert!(matches!(
            router.endpoint_mut("/a/{num:int}/b"),
            Err(Error::BindingConflict { ref existing, ref incoming, .. })
                if existing == "id" && incoming == "num"
        ));
        assert!(router.endpoint_mut("/a/{id:int}/b").is_ok());
        assert!(router.endpoint_mut("/a/{num:float}").is_ok());
    }

    #[test]
    fn test_endpoint_conflict() {
        let mut router = Router::new();
        router.add_endpoint("/x", Endpoint::new("/x")).unwrap();
        assert_eq!(
            router.add_endpoint("/x", Endpoint::new("/x")).unwrap_err(),
            Error::EndpointConflict("/x".to_string())
        );
    }

    fn api_router() -> Router {
        let mut router = router_with(&["/", "/users/{id:int}", "/users/me", "/items/{name}/{flag:bool}"]);
        router.add_route("/users/me", &[Method::GET], ok_handler("me")).unwrap();
        router
    }

    #[test]
    fn test_merge_matches_like_sub_router() {
        let sub = api_router();
        let mut app = router_with(&["/health"]);
        app.merge_router("/api", api_router()).unwrap();

        for sub_path in ["/users/7", "/users/me", "/items/box/true", "/"] {
            let direct = sub.match_path(sub_path).unwrap();
            let merged_path = if sub_path == "/" { "/api".to_string() } else { format!("/api{sub_path}") };
            let merged = app.match_path(&merged_path).unwrap();
            let expected = match direct.endpoint.path() {
                "/" => "/api".to_string(),
                template => format!("/api{template}"),
            };
            assert_eq!(merged.endpoint.path(), expected);
            assert_eq!(merged.params, direct.params);
        }

        assert!(app.match_path("/health").is_some());
        assert!(app.match_path("/users/7").is_none());
    }

    #[test]
    fn test_merge_into_existing_prefix_unions_structure() {
        let mut app = router_with(&["/api/status"]);
        app.merge_router("/api", router_with(&["/users"])).unwrap();
        assert!(app.match_path("/api/status").is_some());
        assert!(app.match_path("/api/users").is_some());
    }

    #[test]
    fn test_merged_endpoints_report_mounted_template() {
        let mut app = Router::new();
        let mut sub = Router::new();
        sub.add_route("/users", &[Method::GET], ok_handler("users")).unwrap();
        sub.endpoint_mut("/users/{id:int}").unwrap();
        app.merge_router("/api", sub).unwrap();

        assert_eq!(matched_path(&app, "/api/users").as_deref(), Some("/api/users"));
        assert_eq!(matched_path(&app, "/api/users/3").as_deref(), Some("/api/users/{id:int}"));
        assert_eq!(
            app.add_route("/api/users", &[Method::GET], ok_handler("again")),
            Err(Error::DuplicateMethod {
                path: "/api/users".to_string(),
                method: "GET".to_string(),
            })
        );

        let mut root = Router::new();
        root.merge_router("", router_with(&["/ping"])).unwrap();
        assert_eq!(matched_path(&root, "/ping").as_deref(), Some("/ping"));
    }

    #[test]
    fn test_merge_endpoint_conflict_is_atomic() {
        let mut app = router_with(&["/api"]);
        let sub = router_with(&["/", "/users"]);
        assert_eq!(
            app.merge_router("/api", sub).unwrap_err(),
            Error::EndpointConflict("/api".to_string())
        );
        assert!(app.match_path("/api/users").is_none());
    }

    #[test]
    fn test_merge_duplicate_binding_across_prefix() {
        let mut app = Router::new();
        let sub = router_with(&["/{id:int}"]);
        assert!(matches!(
            app.merge_router("/users/{id:int}", sub),
            Err(Error::DuplicateBinding { ref binding, .. }) if binding == "id"
        ));
        assert!(app.routes().is_empty());
        assert!(app.match_path("/users/1/2").is_none());
    }

    #[test]
    fn test_merge_binding_conflict() {
        let mut app = router_with(&["/{id:int}/a"]);
        let sub = router_with(&["/{num:int}/b"]);
        assert!(matches!(app.merge_router("", sub), Err(Error::BindingConflict { .. })));
        assert!(app.match_path("/1/b").is_none());
    }

    #[test]
    fn test_cast_registration() {
        let mut registry = CastRegistry::new();
        assert_eq!(registry.names(), vec!["bool", "float", "int", "str"]);

        registry.register("version", VersionCast).unwrap();
        registry.register("version", VersionCast).unwrap();
        assert!(registry.contains("version"));

        struct Other;
        impl Cast for Other {
            fn pattern(&self) -> &str {
                "[a-z]+"
            }
            fn parse(&self, segment: &str) -> Option<Value> {
                Some(Value::from(segment))
            }
            fn serialize(&self, value: &Value) -> Option<String> {
                value.as_str().map(str::to_string)
            }
        }
        assert_eq!(
            registry.register("version", Other).unwrap_err(),
            Error::DuplicateCast("version".to_string())
        );
        assert_eq!(
            registry.resolve("missing").unwrap_err(),
            Error::UnknownCast("missing".to_string())
        );
    }

    #[test]
    fn test_invalid_cast_pattern() {
        struct Broken;
        impl Cast for Broken {
            fn pattern(&self) -> &str {
                "([a-z"
            }
            fn parse(&self, _segment: &str) -> Option<Value> {
                None
            }
            fn serialize(&self, _value: &Value) -> Option<String> {
                None
            }
        }
        let mut registry = CastRegistry::new();
        assert!(matches!(
            registry.register("broken", Broken),
            Err(Error::InvalidPattern { ref name, .. }) if name == "broken"
        ));
    }

    #[test]
    fn test_merge_cast_conflict_is_atomic() {
        struct Lower;
        impl Cast for Lower {
            fn pattern(&self) -> &str {
                "[a-z]+"
            }
            fn parse(&self, segment: &str) -> Option<Value> {
                Some(Value::from(segment))
            }
            fn serialize(&self, value: &Value) -> Option<String> {
                value.as_str().map(str::to_string)
            }
        }
        struct Slug;
        impl Cast for Slug {
            fn pattern(&self) -> &str {
                "[a-z-]+"
            }
            fn parse(&self, segment: &str) -> Option<Value> {
                Some(Value::from(segment))
            }
            fn serialize(&self, value: &Value) -> Option<String> {
                value.as_str().map(str::to_string)
            }
        }

        let mut app = Router::new();
        app.register_cast("slug", Lower).unwrap();

        let mut sub = Router::new();
        sub.register_cast("slug", Slug).unwrap();
        sub.endpoint_mut("/posts/{post:slug}").unwrap();

        assert!(matches!(app.merge_router("/blog", sub), Err(Error::CastConflict { ref name, .. }) if name == "slug"));
        assert!(app.match_path("/blog/posts/abc").is_none());
        assert_eq!(app.casts().resolve("slug").unwrap().pattern(), "[a-z]+");
    }

    #[test]
    fn test_merge_brings_sub_router_casts() {
        let mut sub = Router::new();
        sub.register_cast("version", VersionCast).unwrap();
        sub.endpoint_mut("/{version:version}/docs").unwrap();

        let mut app = Router::new();
        app.merge_router("/api", sub).unwrap();
        assert!(app.casts().contains("version"));

        let matched = app.match_path("/api/v2.1/docs").unwrap();
        assert_eq!(
            matched.params.get_custom::<Version>("version"),
            Some(&Version { major: 2, minor: 1 })
        );
        assert!(app.match_path("/api/2.1/docs").is_none());
    }

    #[test]
    fn test_cast_round_trips() {
        let registry = CastRegistry::new();
        let cases = [
            ("int", Value::Int(0)),
            ("int", Value::Int(-5)),
            ("int", Value::Int(12345)),
            ("bool", Value::Bool(true)),
            ("bool", Value::Bool(false)),
            ("float", Value::Float(2.75)),
            ("float", Value::Float(-0.5)),
            ("str", Value::from("hello world")),
        ];
        for (cast, value) in cases {
            let spec = registry.resolve(cast).unwrap();
            let rendered = spec.serialize(&value).unwrap();
            assert!(spec.matches(&rendered), "{rendered} should match {cast}");
            assert_eq!(spec.parse(&rendered), Some(value));
        }
    }

    #[test]
    fn test_serialize_rejects_wrong_type() {
        let registry = CastRegistry::new();
        let int = registry.resolve("int").unwrap();
        assert_eq!(int.serialize(&Value::from("12")), None);
        let float = registry.resolve("float").unwrap();
        assert_eq!(float.serialize(&Value::Float(f64::NAN)), None);
        let string = registry.resolve("str").unwrap();
        assert_eq!(string.serialize(&Value::from("a/b")), None);
    }

    #[test]
    fn test_url_for() {
        let router = router_with(&["/users/{id:int}/posts/{slug}"]);
        let mut params = Params::new();
        params.insert("id", 42i64);
        params.insert("slug", "hello");
        assert_eq!(
            router.url_for("/users/{id:int}/posts/{slug}", &params).unwrap(),
            "/users/42/posts/hello"
        );
        assert_eq!(router.url_for("/", &Params::new()).unwrap(), "/");

        params.remove("slug");
        assert!(matches!(
            router.url_for("/users/{id:int}/posts/{slug}", &params),
            Err(Error::MissingParam { ref binding, .. }) if binding == "slug"
        ));

        params.insert("id", "abc");
        params.insert("slug", "x");
        assert_eq!(
            router.url_for("/users/{id:int}/posts/{slug}", &params).unwrap_err(),
            Error::ParamMismatch {
                binding: "id".to_string(),
                cast: "int".to_string(),
            }
        );
    }

    #[test]
    fn test_routes_listing() {
        let mut router = Router::new();
        router.add_route("/b", &[Method::POST, Method::GET], ok_handler("b")).unwrap();
        router.add_route("/", &[Method::GET], ok_handler("root")).unwrap();
        router.add_route("/a/{id:int}", &[Method::DELETE], ok_handler("a")).unwrap();

        let routes = router.routes();
        let paths: Vec<&str> = routes.iter().map(|route| route.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/a/{id:int}", "/b"]);
        assert_eq!(routes[2].methods, vec![Method::GET, Method::POST]);
        assert!(!routes[2].websocket);
    }

    #[test]
    fn test_get_endpoint_by_template() {
        let router = router_with(&["/users/{id:int}"]);
        assert!(router.get_endpoint("/users/{id:int}").is_some());
        assert!(router.get_endpoint("/users/{id}").is_none());
        assert!(router.get_endpoint("/users").is_none());
    }
}
