mod codec;
mod cookies;
mod interceptor;
mod request;
mod response;
mod rest_client;
mod status_handler;
mod uri;

pub use codec::{default_codecs, BodyCodec, CodecError, EncodedBody, FormCodec, Hints, JsonCodec, JsonView, StringCodec};
pub use cookies::Cookies;
pub use interceptor::{BufferingPolicy, Interceptor, Next, RequestInitializer};
pub use request::{Multipart, Part, PartMetadata, RequestBuilder};
pub use response::{
    ApiResult, ClientErrorStatus, ClientResponse, ResponseEntity, ResponseError, ResponseErrorKind, ResponseSpec,
    ServerErrorStatus,
};
pub use rest_client::{RestClient, RestClientBuilder};
pub use status_handler::StatusHandler;
pub use uri::{expand_uri_template, resolve_uri, UriExpansionError, UriVariables};
