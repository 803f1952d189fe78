mod http_caller;

pub(crate) use http_caller::RecordingHttpCaller;
