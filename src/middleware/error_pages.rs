use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::app::{App, SharedApp};
use crate::channel::{Outbound, ReceiveFn, Scope, ScopeType, SendFn};
use crate::error::Error;
use crate::http::StatusCode;

/// Replaces the body of every `4xx`/`5xx` response with an HTML error page.
///
/// The original body event is swallowed, so the response still consists of
/// one start event and one body event.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorPages;

impl super::Layer for ErrorPages {
    fn wrap(&self, inner: SharedApp) -> SharedApp {
        Arc::new(ErrorPagesService { inner })
    }
}

struct ErrorPagesService {
    inner: SharedApp,
}

#[async_trait]
impl App for ErrorPagesService {
    async fn call(&self, scope: Scope, receive: ReceiveFn, send: SendFn) -> Result<(), Error> {
        if scope.scope_type != ScopeType::Http {
            return self.inner.call(scope, receive, send).await;
        }

        let replaced = Arc::new(AtomicBool::new(false));
        let inner_send = send;
        let send: SendFn = Arc::new(move |event| {
            let inner_send = Arc::clone(&inner_send);
            let replaced = Arc::clone(&replaced);
            Box::pin(async move {
                if replaced.load(Ordering::Acquire) {
                    return Ok(());
                }
                match event {
                    Outbound::ResponseStart { status, mut headers } if status.is_error() => {
                        let page = render_page(status);
                        headers.set("content-type", "text/html; charset=utf-8");
                        headers.set("content-length", page.len().to_string());
                        replaced.store(true, Ordering::Release);

                        inner_send(Outbound::ResponseStart { status, headers }).await?;
                        inner_send(Outbound::ResponseBody {
                            body: page.into_bytes(),
                            more_body: false,
                        })
                        .await
                    }
                    event => inner_send(event).await,
                }
            })
        });

        self.inner.call(scope, receive, send).await
    }
}

fn render_page(status: StatusCode) -> String {
    let code = status.as_u16();
    let reason = status.reason_phrase();
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head><meta charset=\"UTF-8\" /><title>Error {code}</title></head>\n\
         <body><div class=\"error\"><span class=\"status-code\">{code}</span> \
         <span class=\"status-message\">{reason}</span></div></body>\n\
         </html>\n"
    )
}
