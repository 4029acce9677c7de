use thiserror::Error;

#[derive(Error, Debug)]
pub enum TwitterError {
    #[error("{context} returned {status} {reason}")]
    Endpoint {
        status: u16,
        reason: String,
        context: String,
    },

    #[error("rate limited until {reset_at}")]
    RateLimited { reset_at: i64 },

    #[error("malformed response: {context}")]
    MalformedResponse { context: String },

    #[error("unknown media type '{kind}' in tweet {item_id}")]
    UnknownMediaKind { kind: String, item_id: i64 },

    #[error("no downloadable media url in tweet {item_id}")]
    UnresolvedMedia { item_id: i64 },

    #[error("pagination of {feed} stalled")]
    PaginationStalled { feed: String },

    #[error("invalid header: {name}")]
    InvalidHeader { name: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl TwitterError {
    pub(crate) fn malformed(context: impl Into<String>) -> Self {
        Self::MalformedResponse {
            context: context.into(),
        }
    }
}
