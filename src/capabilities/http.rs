use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crux_http::{Error as HttpError, Http, RequestBuilder, Response};

use crate::api::{Endpoint, HttpMethod};
use crate::config::ApiBase;
use crate::error::ApiError;
use crate::event::Event;

/// Converts a typed crux_http outcome into the plain result carried on events.
pub fn into_json_result<T>(result: crux_http::Result<Response<T>>) -> Result<T, ApiError> {
    match result {
        Ok(mut response) => {
            let status: u16 = response.status().into();
            if !(200..300).contains(&status) {
                return Err(ApiError::status(status, "unexpected response status"));
            }
            response
                .take_body()
                .ok_or_else(|| ApiError::InvalidBody("empty response body".into()))
        }
        Err(e) => Err(from_http_error(e)),
    }
}

/// For endpoints answering with no body (204 on delete).
pub fn into_empty_result(result: crux_http::Result<Response<Vec<u8>>>) -> Result<(), ApiError> {
    match result {
        Ok(response) => {
            let status: u16 = response.status().into();
            if (200..300).contains(&status) {
                Ok(())
            } else {
                Err(ApiError::status(status, "unexpected response status"))
            }
        }
        Err(e) => Err(from_http_error(e)),
    }
}

/// 4xx and 5xx responses arrive here as `HttpError::Http`, never as `Ok`.
fn from_http_error(error: HttpError) -> ApiError {
    match error {
        HttpError::Http(e) => ApiError::status(e.code.into(), e.message),
        HttpError::Timeout => ApiError::Timeout,
        HttpError::Json(message) => ApiError::InvalidBody(message),
        HttpError::Url(message) => ApiError::Request(message),
        HttpError::Io(message) => ApiError::Transport(message),
    }
}

/// Request builder bound to the configured backend and the session token.
pub struct Backend<'a> {
    http: &'a Http<Event>,
    base: &'a ApiBase,
    token: Option<&'a SecretString>,
}

impl<'a> Backend<'a> {
    #[must_use]
    pub const fn new(http: &'a Http<Event>, base: &'a ApiBase, token: Option<&'a SecretString>) -> Self {
        Self { http, base, token }
    }

    fn request(&self, endpoint: Endpoint) -> RequestBuilder<Event> {
        let url = endpoint.url(self.base);
        debug!(
            %endpoint,
            report_id = ?endpoint.report_id(),
            authenticated = self.token.is_some(),
            "backend request"
        );
        let builder = match endpoint.method() {
            HttpMethod::Get => self.http.get(url),
            HttpMethod::Post => self.http.post(url),
            HttpMethod::Patch => self.http.patch(url),
            HttpMethod::Delete => self.http.delete(url),
        };
        match self.token {
            Some(token) => builder.header(
                "Authorization",
                format!("Bearer {}", token.expose_secret()),
            ),
            None => builder,
        }
    }

    /// Sends a bodiless request and decodes a JSON response.
    pub fn call_json<T, F>(&self, endpoint: Endpoint, make_event: F)
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<T, ApiError>) -> Event + Send + 'static,
    {
        self.request(endpoint)
            .expect_json::<T>()
            .send(move |result| make_event(into_json_result(result)));
    }

    /// Sends a JSON body and decodes a JSON response.
    pub fn send_json<B, T, F>(&self, endpoint: Endpoint, body: &B, make_event: F) -> Result<(), ApiError>
    where
        B: Serialize,
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<T, ApiError>) -> Event + Send + 'static,
    {
        self.request(endpoint)
            .body_json(body)
            .map_err(|e| ApiError::Request(e.to_string()))?
            .expect_json::<T>()
            .send(move |result| make_event(into_json_result(result)));
        Ok(())
    }

    /// Sends a JSON body and ignores the response body.
    pub fn send_and_forget<B, F>(&self, endpoint: Endpoint, body: &B, make_event: F) -> Result<(), ApiError>
    where
        B: Serialize,
        F: FnOnce(Result<(), ApiError>) -> Event + Send + 'static,
    {
        self.request(endpoint)
            .body_json(body)
            .map_err(|e| ApiError::Request(e.to_string()))?
            .send(move |result| make_event(into_empty_result(result)));
        Ok(())
    }

    /// Sends a bodiless request whose response has no body.
    pub fn call_empty<F>(&self, endpoint: Endpoint, make_event: F)
    where
        F: FnOnce(Result<(), ApiError>) -> Event + Send + 'static,
    {
        self.request(endpoint)
            .send(move |result| make_event(into_empty_result(result)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crux_http::http::{self, StatusCode};

    fn rejected(status: StatusCode) -> HttpError {
        HttpError::from(http::Error::from_str(status, "rejected"))
    }

    #[test]
    fn test_status_errors_keep_their_code() {
        let error = from_http_error(rejected(StatusCode::Conflict));
        assert_eq!(error.http_status(), Some(409));
        assert_eq!(error.kind(true), ErrorKind::Conflict);

        assert_eq!(
            from_http_error(rejected(StatusCode::Unauthorized)).kind(false),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            from_http_error(rejected(StatusCode::NotFound)).kind(false),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_timeout_and_io_are_network_failures() {
        assert_eq!(from_http_error(HttpError::Timeout), ApiError::Timeout);
        let io = from_http_error(HttpError::Io("connection reset".into()));
        assert_eq!(io, ApiError::Transport("connection reset".into()));
        assert_eq!(io.kind(false), ErrorKind::Network);
    }

    #[test]
    fn test_undecodable_body() {
        let error = from_http_error(HttpError::Json("expected value".into()));
        assert!(matches!(error, ApiError::InvalidBody(_)));
    }
}
