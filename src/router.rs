//! Request routing between a host and the [`SelectionEngine`].
//!
//! Requests and responses are JSON objects tagged by `type`. Responses echo
//! the request type and parameters so the host can match them to requests.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::engine::{GeometryRecord, Schema, SelectionEngine};
use crate::error::RouterError;

/// Inbound request.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub enum Request {
    /// Build the engine from the given records.
    Init {
        /// Records and engine configuration.
        schema: Schema,
    },
    /// Select records intersecting the box spanned by `[x1, y1, x2, y2]`.
    SelectBox {
        /// Two opposite corners, any order.
        points: [f64; 4],
    },
    /// Select records inside the lasso `[x1, y1, ..., xn, yn]`.
    SelectLasso {
        /// Flattened polygon vertices.
        points: Vec<f64>,
    },
    /// Pick the record nearest to `[x, y]`.
    GetClosestPoint {
        /// Query point.
        point: [f64; 2],
    },
    /// Any other `type`; logged and ignored.
    #[serde(other)]
    Unknown,
}

/// Outbound response.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub enum Response {
    /// The engine is built and accepting selections.
    Ready,
    /// Answer to [`Request::SelectBox`].
    SelectBox {
        /// Selected records.
        selection: Vec<GeometryRecord>,
        /// The request's corners.
        bounds: [f64; 4],
    },
    /// Answer to [`Request::SelectLasso`].
    SelectLasso {
        /// Selected records.
        selection: Vec<GeometryRecord>,
        /// The request's polygon.
        bounds: Vec<f64>,
    },
    /// Answer to [`Request::GetClosestPoint`].
    GetClosestPoint {
        /// Nearest record, `null` when nothing is indexed.
        point: Option<GeometryRecord>,
    },
}

#[derive(Debug, Default)]
enum RouterState {
    #[default]
    Uninitialized,
    Ready(SelectionEngine),
}

/// Dispatches requests to the engine it owns.
///
/// The engine exists from the first `init` on; a later `init` replaces it.
///
/// # Example
/// ```
/// use hilbert_select::Router;
///
/// let mut router = Router::new();
/// let init = r#"{"type":"init","schema":{"data":[{"values":[
///     {"coordinates":[1,1],"dimensions":[0,0],"id":"a"},
///     {"coordinates":[8,8],"dimensions":[0,0],"id":"b"}
/// ]}]}}"#;
/// router.handle_message(init)?;
///
/// let response = router
///     .handle_message(r#"{"type":"getClosestPoint","point":[7,7]}"#)?
///     .expect("known request");
/// let json = serde_json::to_value(&response)?;
/// assert_eq!(json["type"], "getClosestPoint");
/// assert_eq!(json["point"]["id"], "b");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Default)]
pub struct Router {
    state: RouterState,
}

impl Router {
    /// Creates a router waiting for `init`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an engine has been built.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, RouterState::Ready(_))
    }

    /// The engine, once built.
    pub fn engine(&self) -> Option<&SelectionEngine> {
        match &self.state {
            RouterState::Ready(engine) => Some(engine),
            RouterState::Uninitialized => None,
        }
    }

    /// Parses one JSON request and dispatches it.
    ///
    /// # Errors
    /// Fails on malformed JSON and on any error from [`handle`](Self::handle).
    pub fn handle_message(&mut self, message: &str) -> Result<Option<Response>, RouterError> {
        let request: Request = serde_json::from_str(message)?;
        if request == Request::Unknown {
            log::warn!("ignoring request of unknown type: {message}");
            return Ok(None);
        }
        self.handle(request)
    }

    /// Dispatches a request; `Ok(None)` for requests that produce no response.
    ///
    /// # Errors
    /// Returns [`RouterError::NotReady`] for selections before `init`,
    /// [`RouterError::OddCoordinateCount`] for unpaired lasso values, and
    /// propagates engine failures.
    pub fn handle(&mut self, request: Request) -> Result<Option<Response>, RouterError> {
        let response = match request {
            Request::Init { schema } => {
                let sources = schema.data.len();
                let engine = SelectionEngine::from_schema(schema)?;
                log::info!(
                    "selection engine ready: {} records from {} sources",
                    engine.len(),
                    sources
                );
                self.state = RouterState::Ready(engine);
                Response::Ready
            }
            Request::SelectBox { points } => {
                let [x1, y1, x2, y2] = points;
                let selection = self.engine_mut()?.select_box([x1, y1], [x2, y2])?;
                Response::SelectBox {
                    selection: selection.into_iter().cloned().collect(),
                    bounds: points,
                }
            }
            Request::SelectLasso { points } => {
                let engine = self.engine_mut()?;
                if points.len() % 2 != 0 {
                    return Err(RouterError::OddCoordinateCount(points.len()));
                }
                let vertices: Vec<[f64; 2]> =
                    points.chunks_exact(2).map(|pair| [pair[0], pair[1]]).collect();
                let selection = engine.select_lasso(&vertices)?;
                Response::SelectLasso {
                    selection: selection.into_iter().cloned().collect(),
                    bounds: points,
                }
            }
            Request::GetClosestPoint { point } => Response::GetClosestPoint {
                point: self.engine_mut()?.closest_point(point)?.cloned(),
            },
            Request::Unknown => {
                log::warn!("ignoring request of unknown type");
                return Ok(None);
            }
        };
        Ok(Some(response))
    }

    fn engine_mut(&mut self) -> Result<&mut SelectionEngine, RouterError> {
        match &mut self.state {
            RouterState::Ready(engine) => Ok(engine),
            RouterState::Uninitialized => Err(RouterError::NotReady),
        }
    }

    /// Serves line-delimited JSON requests from `reader` until end of input,
    /// writing one JSON response per line to `writer`.
    ///
    /// Blank lines are skipped. The first error stops the loop.
    ///
    /// # Errors
    /// Propagates I/O, parse and dispatch failures.
    pub fn run<R: BufRead, W: Write>(&mut self, reader: R, mut writer: W) -> Result<(), RouterError> {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_message(&line)? {
                serde_json::to_writer(&mut writer, &response)?;
                writeln!(writer)?;
                writer.flush()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn init_message() -> String {
        let values: Vec<Value> = (0..5)
            .flat_map(|i| (0..5).map(move |j| (i, j)))
            .map(|(i, j)| {
                json!({
                    "coordinates": [f64::from(i) * 10.0, f64::from(j) * 10.0],
                    "dimensions": [0.0, 0.0],
                    "label": format!("{i}-{j}"),
                })
            })
            .collect();
        json!({
            "type": "init",
            "schema": { "data": [ { "name": "grid", "values": values } ], "config": { "nodeSize": 4 } }
        })
        .to_string()
    }

    fn ready_router() -> Router {
        let mut router = Router::new();
        let response = router.handle_message(&init_message()).expect("init succeeds");
        assert_eq!(response, Some(Response::Ready));
        router
    }

    fn to_json(response: Option<Response>) -> Value {
        serde_json::to_value(response.expect("response expected")).expect("serializable")
    }

    #[test]
    fn starts_uninitialized() {
        let mut router = Router::new();
        assert!(!router.is_ready());
        let err = router
            .handle_message(r#"{"type":"selectBox","points":[0,0,1,1]}"#)
            .expect_err("selection before init");
        assert!(matches!(err, RouterError::NotReady));
    }

    #[test]
    fn init_builds_engine_with_config() {
        let router = ready_router();
        let engine = router.engine().expect("ready");
        assert_eq!(engine.len(), 25);
        assert_eq!(engine.index().node_size(), 4);
        assert_eq!(serde_json::to_value(Response::Ready).expect("json"), json!({"type": "ready"}));
    }

    #[test]
    fn select_box_echoes_bounds() {
        let mut router = ready_router();
        let json = to_json(
            router
                .handle_message(r#"{"type":"selectBox","points":[25,25,5,5]}"#)
                .expect("dispatch"),
        );
        assert_eq!(json["type"], "selectBox");
        assert_eq!(json["bounds"], json!([25.0, 25.0, 5.0, 5.0]));
        let mut labels: Vec<&str> = json["selection"]
            .as_array()
            .expect("selection array")
            .iter()
            .map(|r| r["label"].as_str().expect("label kept"))
            .collect();
        labels.sort_unstable();
        assert_eq!(labels, vec!["1-1", "1-2", "2-1", "2-2"]);
    }

    #[test]
    fn select_lasso_pairs_coordinates() {
        let mut router = ready_router();
        let json = to_json(
            router
                .handle_message(r#"{"type":"selectLasso","points":[-5,-5,45,-5,-5,45]}"#)
                .expect("dispatch"),
        );
        assert_eq!(json["type"], "selectLasso");
        assert_eq!(json["bounds"].as_array().map(Vec::len), Some(6));
        // Grid points with i + j <= 4 lie inside or on the triangle.
        assert_eq!(json["selection"].as_array().map(Vec::len), Some(15));
    }

    #[test]
    fn odd_lasso_is_rejected() {
        let mut router = ready_router();
        let err = router
            .handle_message(r#"{"type":"selectLasso","points":[0,0,1]}"#)
            .expect_err("unpaired value");
        assert!(matches!(err, RouterError::OddCoordinateCount(3)));
    }

    #[test]
    fn closest_point_returns_record() {
        let mut router = ready_router();
        let json = to_json(
            router
                .handle_message(r#"{"type":"getClosestPoint","point":[31,18]}"#)
                .expect("dispatch"),
        );
        assert_eq!(json["type"], "getClosestPoint");
        assert_eq!(json["point"]["label"], "3-2");
        assert_eq!(json["point"]["coordinates"], json!([30.0, 20.0]));
    }

    #[test]
    fn unknown_requests_are_ignored() {
        let mut router = ready_router();
        let response = router
            .handle_message(r#"{"type":"zoomTo","level":3}"#)
            .expect("unknown types are not errors");
        assert_eq!(response, None);
        assert_eq!(router.engine().map(SelectionEngine::len), Some(25), "engine untouched");
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut router = Router::new();
        assert!(matches!(router.handle_message("{not json"), Err(RouterError::Json(_))));
        assert!(matches!(
            router.handle_message(r#"{"points":[0,0,1,1]}"#),
            Err(RouterError::Json(_))
        ));
    }

    #[test]
    fn run_serves_line_delimited_requests() {
        let input = format!(
            "{}\n\n{}\n{}\n",
            init_message(),
            r#"{"type":"unknown"}"#,
            r#"{"type":"getClosestPoint","point":[0,0]}"#
        );
        let mut output = Vec::new();
        Router::new()
            .run(input.as_bytes(), &mut output)
            .expect("loop completes");

        let lines: Vec<Value> = String::from_utf8(output)
            .expect("utf-8 output")
            .lines()
            .map(|line| serde_json::from_str(line).expect("one JSON value per line"))
            .collect();
        assert_eq!(lines.len(), 2, "ready + closest point; unknown is silent");
        assert_eq!(lines[0]["type"], "ready");
        assert_eq!(lines[1]["point"]["label"], "0-0");
    }
}
