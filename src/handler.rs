//! Hickory request handler tying resolution and logging together.

use async_trait::async_trait;
use hickory_proto::op::{Header, Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::Record;
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use tracing::{debug, error, warn};

use crate::metrics;
use crate::query_log::{QueryLogger, Reply};
use crate::resolver::Resolver;

/// Answers every query itself and logs it for the owner of the name.
#[derive(Clone)]
pub struct CaptureHandler {
    resolver: Resolver,
    logger: QueryLogger,
}

impl CaptureHandler {
    /// Create a handler from its two halves.
    pub fn new(resolver: Resolver, logger: QueryLogger) -> Self {
        Self { resolver, logger }
    }
}

#[async_trait]
impl RequestHandler for CaptureHandler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        let request_info = match request.request_info() {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, src = %request.src(), "unusable request");
                return send_empty(request, &mut response_handle, ResponseCode::FormErr).await;
            }
        };

        // Original case, for the answer owner and the log
        let query = request_info.query.original();
        let name = query.name().clone();
        let query_type = query.query_type();
        let src = request.src();

        debug!(name = %name, rtype = %query_type, src = %src, "query received");

        let (code, answers): (ResponseCode, Vec<Record>) =
            match self.resolver.resolve(&name, query_type).await {
                Ok(resolution) => {
                    let answers = resolution
                        .answer()
                        .filter(|answer| answer.matches(query_type))
                        .map(|answer| vec![answer.to_record(name.clone())])
                        .unwrap_or_default();
                    (ResponseCode::NoError, answers)
                }
                Err(e) => {
                    error!(name = %name, rtype = %query_type, error = %e, "resolution failed");
                    (ResponseCode::ServFail, Vec::new())
                }
            };

        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);
        header.set_response_code(code);

        let response = MessageResponseBuilder::from_message_request(request).build(
            header,
            answers.iter(),
            &[],
            &[],
            &[],
        );

        let info = match response_handle.send_response(response).await {
            Ok(info) => info,
            Err(e) => {
                error!(error = %e, "failed to send response");
                ResponseInfo::from(header)
            }
        };

        let raw = request_bytes(request, query);
        let reply = Reply {
            header,
            name,
            query_type,
            answers,
        };
        if let Err(e) = self.logger.record(&reply, src, &raw).await {
            error!(name = %reply.name, error = %e, "failed to log query");
            metrics::record_log_error();
        }

        info
    }
}

/// Wire form of the request as parsed: header flags, question and EDNS.
fn request_bytes(request: &Request, query: &Query) -> Vec<u8> {
    let header = request.header();
    let mut message = Message::new();
    message.set_id(header.id());
    message.set_message_type(MessageType::Query);
    message.set_op_code(header.op_code());
    message.set_recursion_desired(header.recursion_desired());
    message.set_authentic_data(header.authentic_data());
    message.set_checking_disabled(header.checking_disabled());

    message.add_query(query.clone());

    if let Some(edns) = request.edns() {
        message.set_edns(edns.clone());
    }

    message.to_vec().unwrap_or_else(|e| {
        debug!(error = %e, "could not re-encode request");
        Vec::new()
    })
}

async fn send_empty<R: ResponseHandler>(
    request: &Request,
    response_handle: &mut R,
    code: ResponseCode,
) -> ResponseInfo {
    let mut header = Header::response_from_request(request.header());
    header.set_response_code(code);
    let response = MessageResponseBuilder::from_message_request(request).build_no_records(header);

    match response_handle.send_response(response).await {
        Ok(info) => info,
        Err(e) => {
            error!(error = %e, "failed to send error response");
            ResponseInfo::from(header)
        }
    }
}
