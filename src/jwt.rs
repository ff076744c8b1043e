use actix_web::body::EitherBody;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage, HttpRequest, HttpResponse,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (caller ID)
    #[serde(default)]
    pub email: String,
    pub exp: usize, // Expiration time
    pub iat: usize, // Issued at
}

/// Bearer-token gate in front of the bid endpoint.
#[derive(Clone)]
pub struct JwtAuth {
    key: DecodingKey,
}

impl JwtAuth {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    fn verify_token(key: &DecodingKey, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, key, &Validation::default()).map(|token_data| token_data.claims)
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddleware {
            service: Rc::new(service),
            key: Rc::new(self.key.clone()),
        }))
    }
}

pub struct JwtAuthMiddleware<S> {
    service: Rc<S>,
    key: Rc<DecodingKey>,
}

fn unauthorized(req: ServiceRequest, message: &str) -> ServiceResponse {
    let (req, _pl) = req.into_parts();
    let resp = HttpResponse::Unauthorized()
        .content_type("application/json")
        .json(serde_json::json!({ "error": message }));
    ServiceResponse::new(req, resp)
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let key = self.key.clone();

        Box::pin(async move {
            let token = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(str::to_owned);

            let Some(token) = token else {
                debug!("Rejected request without bearer token");
                return Ok(unauthorized(req, "Missing Authorization header").map_into_right_body());
            };

            match JwtAuth::verify_token(&key, &token) {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    let res = svc.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(err) => {
                    debug!(error = %err, "Rejected request with invalid token");
                    Ok(unauthorized(req, "Invalid token").map_into_right_body())
                }
            }
        })
    }
}

// Helper function to extract claims from request
pub fn get_claims(req: &HttpRequest) -> Option<Claims> {
    req.extensions().get::<Claims>().cloned()
}
