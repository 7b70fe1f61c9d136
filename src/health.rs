//! Health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? |
//! | **Readiness** | `/readyz` | Has the asset snapshot been taken? |
//!
//! Readiness is gated on the asset directory because classification is
//! wrong without it. [`App::router`](crate::App::router) wires it up.

use crate::{Request, Response, Status};

/// Always `200 OK` with body `"ok"`.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// `200 ready` when `ready`, `503` otherwise.
pub fn readiness(ready: bool) -> Response {
    if ready {
        Response::text("ready")
    } else {
        Response::builder()
            .status(Status::ServiceUnavailable)
            .text("warming up")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;

    #[tokio::test]
    async fn test_liveness() {
        let res = liveness(Request::new(Method::Get, "/healthz", vec![])).await;
        assert_eq!(res.body(), b"ok");
    }

    #[test]
    fn test_readiness() {
        assert_eq!(readiness(true).status_code(), Status::Ok);
        assert_eq!(readiness(false).status_code(), Status::ServiceUnavailable);
    }
}
