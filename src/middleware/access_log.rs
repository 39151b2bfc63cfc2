use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use log::info;

use crate::app::{App, SharedApp};
use crate::channel::{Outbound, ReceiveFn, Scope, ScopeType, SendFn};
use crate::endpoint::WEBSOCKET;
use crate::error::Error;

/// Logs one line per request: method, path, status and elapsed time.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLog;

impl super::Layer for AccessLog {
    fn wrap(&self, inner: SharedApp) -> SharedApp {
        Arc::new(AccessLogService { inner })
    }
}

struct AccessLogService {
    inner: SharedApp,
}

#[async_trait]
impl App for AccessLogService {
    async fn call(&self, scope: Scope, receive: ReceiveFn, send: SendFn) -> Result<(), Error> {
        let method = match scope.scope_type {
            ScopeType::Http => scope.method.clone().unwrap_or_default(),
            ScopeType::WebSocket => WEBSOCKET.to_string(),
        };
        let path = scope.path.clone();

        let status = Arc::new(AtomicU16::new(0));
        let observed = Arc::clone(&status);
        let inner_send = send;
        let send: SendFn = Arc::new(move |event| {
            if let Outbound::ResponseStart { status, .. } = &event {
                observed.store(status.as_u16(), Ordering::Relaxed);
            }
            inner_send(event)
        });

        let started = Instant::now();
        let result = self.inner.call(scope, receive, send).await;
        let elapsed = started.elapsed();

        match status.load(Ordering::Relaxed) {
            0 => info!("{method} {path} - {elapsed:?}"),
            code => info!("{method} {path} {code} {elapsed:?}"),
        }
        result
    }
}
