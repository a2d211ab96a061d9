//! Request options, wire building, and response classification.
//!
//! A call is described by a [`RequestSpec`] that can be queued and replayed verbatim. Methods
//! that do not start with `http://` or `https://` are API requests: they are resolved against
//! the session's base URL and carry the bearer token. Anything else is sent to the URL as-is,
//! without credentials.

// crates.io
use oauth2::{
	HttpRequest, HttpResponse,
	http::{
		HeaderMap, HeaderValue, Method, Request, StatusCode,
		header::{AUTHORIZATION, CONTENT_TYPE},
	},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	deferred::Deferred,
	error::{self, ApiError, RequestError},
};

/// Query or form parameters, serialized in key order.
pub type Params = BTreeMap<String, String>;

/// Deferred handed back for every request.
pub type ResponseDeferred = Deferred<ApiResponse, RequestError>;

/// Callback invoked once with the final outcome of a request.
pub type RequestCallback = Box<dyn FnOnce(Result<ApiResponse, RequestError>) + Send>;

/// HTTP verbs supported by the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HttpVerb {
	/// Parameters go into the query string.
	#[default]
	Get,
	/// Parameters go into a form-encoded body.
	Post,
}
impl HttpVerb {
	/// Upper-case verb label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
		}
	}

	fn method(self) -> Method {
		match self {
			Self::Get => Method::GET,
			Self::Post => Method::POST,
		}
	}
}
impl Display for HttpVerb {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Replayable description of one call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestSpec {
	/// API path (relative to the base URL) or an absolute URL.
	pub method: String,
	/// HTTP verb.
	pub verb: HttpVerb,
	/// Parameters serialized into the query or the body.
	pub params: Params,
	/// Resolve with the raw response instead of the decoded payload.
	pub return_raw: bool,
}
impl RequestSpec {
	/// Creates a spec without parameters.
	pub fn new(verb: HttpVerb, method: impl Into<String>) -> Self {
		Self { method: method.into(), verb, params: Params::new(), return_raw: false }
	}

	/// Returns `true` for API-relative methods, which need the bearer token.
	pub fn is_api_request(&self) -> bool {
		!(self.method.starts_with("http://") || self.method.starts_with("https://"))
	}
}

/// Caller-facing options for [`Session::request`](crate::session::Session::request).
#[derive(Default)]
pub struct RequestOptions {
	method: String,
	verb: HttpVerb,
	params: Params,
	return_raw: bool,
	callback: Option<RequestCallback>,
}
impl RequestOptions {
	/// Starts options for `method`.
	pub fn new(method: impl Into<String>) -> Self {
		Self { method: method.into(), ..Default::default() }
	}

	/// Overrides the method.
	pub fn method(mut self, method: impl Into<String>) -> Self {
		self.method = method.into();

		self
	}

	/// Overrides the verb.
	pub fn verb(mut self, verb: HttpVerb) -> Self {
		self.verb = verb;

		self
	}

	/// Adds a single parameter.
	pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.insert(key.into(), value.into());

		self
	}

	/// Adds several parameters.
	pub fn params<I, K, V>(mut self, params: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.params.extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));

		self
	}

	/// Resolves with [`ApiResponse::Raw`] instead of the decoded payload.
	pub fn return_raw(mut self, return_raw: bool) -> Self {
		self.return_raw = return_raw;

		self
	}

	/// Registers a callback that receives the final outcome exactly once.
	pub fn callback<F>(mut self, callback: F) -> Self
	where
		F: 'static + FnOnce(Result<ApiResponse, RequestError>) + Send,
	{
		self.callback = Some(Box::new(callback));

		self
	}

	pub(crate) fn into_parts(self) -> (RequestSpec, Option<RequestCallback>) {
		let spec = RequestSpec {
			method: self.method,
			verb: self.verb,
			params: self.params,
			return_raw: self.return_raw,
		};

		(spec, self.callback)
	}
}
impl Debug for RequestOptions {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestOptions")
			.field("method", &self.method)
			.field("verb", &self.verb)
			.field("params", &self.params)
			.field("return_raw", &self.return_raw)
			.field("callback", &self.callback.is_some())
			.finish()
	}
}

/// Transport response kept intact for callers that asked for it.
#[derive(Clone, Debug, PartialEq)]
pub struct RawResponse {
	/// HTTP status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Undecoded body.
	pub body: Vec<u8>,
}
impl RawResponse {
	/// Decodes the body as JSON.
	pub fn json(&self) -> Result<Value, RequestError> {
		serde_json::from_slice(&self.body).map_err(|e| RequestError::unexpected(e.to_string()))
	}
}

/// Successful outcome of a request.
#[derive(Clone, Debug, PartialEq)]
pub enum ApiResponse {
	/// Decoded JSON payload.
	Payload(Value),
	/// Raw transport response, returned when [`RequestOptions::return_raw`] is set.
	Raw(RawResponse),
}
impl ApiResponse {
	/// Returns the decoded payload, if this is not a raw response.
	pub fn payload(&self) -> Option<&Value> {
		match self {
			Self::Payload(value) => Some(value),
			Self::Raw(_) => None,
		}
	}

	/// Consumes the response and returns the decoded payload.
	pub fn into_payload(self) -> Option<Value> {
		match self {
			Self::Payload(value) => Some(value),
			Self::Raw(_) => None,
		}
	}
}

/// How a response settles its request.
#[derive(Debug)]
pub(crate) enum ResponseOutcome {
	Success(ApiResponse),
	TokenRejected(ApiError),
	Failed(RequestError),
}

/// Attaches `callback` to `deferred` so it runs once with whichever outcome arrives.
pub(crate) fn attach_callback(deferred: &ResponseDeferred, callback: RequestCallback) {
	let slot = Arc::new(Mutex::new(Some(callback)));
	let on_reject = slot.clone();

	deferred.subscribe(
		move |response| {
			if let Some(callback) = slot.lock().take() {
				callback(Ok(response));
			}
		},
		move |error| {
			if let Some(callback) = on_reject.lock().take() {
				callback(Err(error));
			}
		},
	);
}

/// Builds the URL a spec targets.
pub(crate) fn resolve_url(base_url: &Url, spec: &RequestSpec) -> Result<Url, RequestError> {
	let raw = if spec.is_api_request() {
		format!("{base_url}{}", spec.method)
	} else {
		spec.method.clone()
	};

	Url::parse(&raw).map_err(|e| RequestError::InvalidRequest {
		message: format!("`{raw}` is not a valid URL: {e}"),
	})
}

/// Turns a spec into an HTTP request, adding the bearer header for API requests.
pub(crate) fn build_http_request(
	base_url: &Url,
	spec: &RequestSpec,
	access_token: Option<&TokenSecret>,
) -> Result<HttpRequest, RequestError> {
	let mut url = resolve_url(base_url, spec)?;
	let mut builder = Request::builder().method(spec.verb.method());
	let body = match spec.verb {
		HttpVerb::Get => {
			if !spec.params.is_empty() {
				url.query_pairs_mut().extend_pairs(&spec.params);
			}

			Vec::new()
		},
		HttpVerb::Post => {
			builder = builder.header(
				CONTENT_TYPE,
				HeaderValue::from_static("application/x-www-form-urlencoded"),
			);

			form_urlencoded::Serializer::new(String::new())
				.extend_pairs(&spec.params)
				.finish()
				.into_bytes()
		},
	};

	if let Some(token) = access_token.filter(|_| spec.is_api_request()) {
		let value = HeaderValue::from_str(&format!("Bearer {}", token.expose())).map_err(|e| {
			RequestError::InvalidRequest {
				message: format!("Access token is not a valid header value: {e}"),
			}
		})?;

		builder = builder.header(AUTHORIZATION, value);
	}

	builder
		.uri(url.as_str())
		.body(body)
		.map_err(|e| RequestError::InvalidRequest { message: e.to_string() })
}

/// Classifies a transport response.
///
/// Status codes of 400 and above are HTTP errors regardless of the body. A truthy `error` key
/// is an API error, or a token rejection when `is_api` is set and the API flagged the
/// `Authorization` header. Otherwise the decoded payload (or the raw response) is a success.
pub(crate) fn classify_response(
	response: HttpResponse,
	is_api: bool,
	return_raw: bool,
) -> ResponseOutcome {
	let status = response.status();

	if status.as_u16() >= 400 {
		return ResponseOutcome::Failed(RequestError::Http {
			status: Some(status.as_u16()),
			message: String::from_utf8_lossy(response.body()).into_owned(),
		});
	}

	let decoded = serde_json::from_slice::<Value>(response.body());
	let api_error =
		decoded.as_ref().ok().and_then(|v| v.get("error")).filter(|e| error::is_truthy(e));

	if let Some(raw_error) = api_error {
		let api = ApiError::from_value(raw_error);

		if is_api && api.is_token_rejected() {
			return ResponseOutcome::TokenRejected(api);
		}

		return ResponseOutcome::Failed(RequestError::Api(api));
	}
	if return_raw {
		let (parts, body) = response.into_parts();

		return ResponseOutcome::Success(ApiResponse::Raw(RawResponse {
			status: parts.status,
			headers: parts.headers,
			body,
		}));
	}

	match decoded {
		Ok(Value::Null) => ResponseOutcome::Failed(RequestError::unexpected("payload was null")),
		Ok(payload) => ResponseOutcome::Success(ApiResponse::Payload(payload)),
		Err(e) => ResponseOutcome::Failed(RequestError::unexpected(e.to_string())),
	}
}
