//! Process CLI (C12): a single flag to print a rendered example spec, per the
//! external interface contract. Everything else is driven by environment
//! variables read directly by [`crate::spec::load_spec`].

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "transportd", about = "OpenAPI-driven reverse proxy")]
pub struct Cli {
    /// Print an example OpenAPI document (with transportd extensions) and exit.
    #[arg(short = 'h', long = "print-example")]
    pub example: bool,
}

pub const EXAMPLE_SPEC: &str = r#"openapi: "3.0.3"
info:
  title: example-service
  version: "1.0.0"
x-transportd-backends:
  backends: [ORDERS, DEFAULT]
  ORDERS:
    host: "http://${ORDERS_BACKEND_HOST}:8080"
    pool:
      count: 4
      ttl: 300
  DEFAULT:
    host: "http://${DEFAULT_BACKEND_HOST}:8080"
    pool:
      count: 2
      ttl: 300
    allowUnknown:
      enabled: [accesslog]
paths:
  /orders/{id}:
    get:
      operationId: get_order
      x-transportd:
        backend: ORDERS
        enabled: [accesslog, metrics, timeout, retry]
        timeout:
          timeout_ms: 2000
        retry:
          codes: [503]
          limit: 3
          backoff_ms: 10
      parameters:
        - name: id
          in: path
          required: true
          schema:
            type: string
      responses:
        "200":
          description: the order
          content:
            application/json:
              schema:
                type: object
                properties:
                  id:
                    type: string
                  status:
                    type: string
"#;
