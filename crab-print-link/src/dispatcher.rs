//! Print job dispatcher
//!
//! Builds job frames for receipts and kitchen tickets and hands them to the
//! [`DeviceLink`]. Jobs are never queued: while the link is down they are
//! rejected with [`LinkError::LinkUnavailable`](crate::LinkError::LinkUnavailable).

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use shared::printing::{JobKind, PrintData, PrintJobPayload};
use tracing::{info, warn};

use crate::error::LinkResult;
use crate::link::DeviceLink;
use crate::state::StatusSubscription;

/// Rendered document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintDocument {
    /// Base64 encoded PDF
    Pdf(String),
    Html(String),
}

impl From<PrintDocument> for PrintData {
    fn from(document: PrintDocument) -> Self {
        match document {
            PrintDocument::Pdf(pdf) => PrintData {
                pdf: Some(pdf),
                html: None,
            },
            PrintDocument::Html(html) => PrintData {
                pdf: None,
                html: Some(html),
            },
        }
    }
}

/// 打印请求
#[derive(Debug, Clone)]
pub struct PrintRequest {
    pub kind: JobKind,
    pub order_id: String,
    pub document: PrintDocument,
    /// 目标打印机 (空 = 守护进程默认打印机)
    pub printer: Option<String>,
    /// 份数
    pub copies: u32,
}

impl PrintRequest {
    pub fn new(kind: JobKind, order_id: impl Into<String>, document: PrintDocument) -> Self {
        Self {
            kind,
            order_id: order_id.into(),
            document,
            printer: None,
            copies: 1,
        }
    }

    pub fn receipt(order_id: impl Into<String>, document: PrintDocument) -> Self {
        Self::new(JobKind::Receipt, order_id, document)
    }

    pub fn kitchen_ticket(order_id: impl Into<String>, document: PrintDocument) -> Self {
        Self::new(JobKind::KitchenTicket, order_id, document)
    }

    pub fn with_printer(mut self, printer: impl Into<String>) -> Self {
        self.printer = Some(printer.into());
        self
    }

    pub fn with_copies(mut self, copies: u32) -> Self {
        self.copies = copies;
        self
    }
}

/// Submits print jobs through a [`DeviceLink`]
#[derive(Clone)]
pub struct PrintJobDispatcher {
    link: DeviceLink,
    last_stamp: Arc<AtomicI64>,
}

impl PrintJobDispatcher {
    pub fn new(link: DeviceLink) -> Self {
        Self {
            link,
            last_stamp: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn link(&self) -> &DeviceLink {
        &self.link
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    /// See [`DeviceLink::subscribe_status`]
    pub fn subscribe_status(
        &self,
        callback: impl Fn(bool) + Send + Sync + 'static,
    ) -> StatusSubscription {
        self.link.subscribe_status(callback)
    }

    /// 打印结账单
    pub async fn print_receipt(
        &self,
        order_id: &str,
        document: PrintDocument,
        printer: Option<&str>,
    ) -> LinkResult<String> {
        let mut request = PrintRequest::receipt(order_id, document);
        request.printer = printer.map(str::to_owned);
        self.submit(request).await
    }

    /// 打印厨房单
    pub async fn print_kitchen_ticket(
        &self,
        order_id: &str,
        document: PrintDocument,
        printer: Option<&str>,
    ) -> LinkResult<String> {
        let mut request = PrintRequest::kitchen_ticket(order_id, document);
        request.printer = printer.map(str::to_owned);
        self.submit(request).await
    }

    /// Submit a job and return its id.
    ///
    /// Success means the frame was written; the daemon's verdict arrives
    /// later on [`DeviceLink::subscribe_deliveries`].
    pub async fn submit(&self, request: PrintRequest) -> LinkResult<String> {
        let job = self.build_job(request);
        let job_id = job.id.clone();
        let kind = job.kind;

        match self.link.submit(job).await {
            Ok(()) => {
                info!(job_id = %job_id, kind = %kind, "Print job submitted");
                Ok(job_id)
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Print job rejected");
                Err(e)
            }
        }
    }

    fn build_job(&self, request: PrintRequest) -> PrintJobPayload {
        let stamp = self.next_stamp();
        PrintJobPayload {
            id: format!("{}-{}-{}", request.kind.code(), request.order_id, stamp),
            kind: request.kind,
            order_id: request.order_id,
            data: request.document.into(),
            printer: request.printer.filter(|p| !p.trim().is_empty()),
            copies: Some(request.copies.max(1)),
        }
    }

    /// Millisecond timestamp, bumped so two jobs never share one
    fn next_stamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let previous = self
            .last_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }
}
