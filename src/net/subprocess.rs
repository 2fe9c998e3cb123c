//! The subprocess-execution contract (§6): "invoke user code, capture the
//! result and post-state, dump before and after, diff the mutated ids."
//! Actually invoking arbitrary user code is out of scope; what's specified
//! is this shape, which the core's `dump`/`compress_memory` slot into.

use serde::{Deserialize, Serialize};

use crate::context::SerializerContext;
use crate::diff::compress_memory;
use crate::memory::PythonId;
use crate::wire::WireDump;

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub request_id: String,
    /// Ids of the bindings a caller wants diffed across the call, captured
    /// from a dump taken before the call runs.
    pub watch_ids: Vec<PythonId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub request_id: String,
    pub dump_before: WireDump,
    pub dump_after: WireDump,
    pub mutated_ids: Vec<PythonId>,
}

/// A harness that can run one request. Implementations own however they
/// actually invoke user code; this crate only requires that the result be
/// expressible as "a root value, serialized before and after."
pub trait ExecutionHarness {
    /// Run whatever `request` names, returning the root value's state
    /// before and after the call.
    fn run(&mut self, request: &ExecutionRequest) -> (crate::value::PyValue, crate::value::PyValue);

    fn execute(&mut self, request: ExecutionRequest) -> ExecutionResponse {
        let (before, after) = self.run(&request);

        let mut before_ctx = SerializerContext::new();
        let before_id = before_ctx.write_object_to_memory(&before).expect("root value must be serializable");

        let mut after_ctx = SerializerContext::new();
        let after_id = after_ctx.write_object_to_memory(&after).expect("root value must be serializable");

        let mut watch_ids = request.watch_ids.clone();
        if watch_ids.is_empty() {
            watch_ids = vec![before_id.clone()];
        }
        // Diffing across two independent sessions only makes sense when
        // the watched id is actually the same root both times.
        let watch_ids: Vec<PythonId> = watch_ids
            .into_iter()
            .map(|id| if id == before_id { after_id.clone() } else { id })
            .collect();

        let mutated_ids = compress_memory(&watch_ids, before_ctx.dump(), after_ctx.dump());

        ExecutionResponse {
            request_id: request.request_id,
            dump_before: WireDump::from(before_ctx.dump()),
            dump_after: WireDump::from(after_ctx.dump()),
            mutated_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PyValue;

    struct EchoHarness;
    impl ExecutionHarness for EchoHarness {
        fn run(&mut self, _request: &ExecutionRequest) -> (PyValue, PyValue) {
            let before = PyValue::list(vec![PyValue::int(1)]);
            let after = PyValue::list(vec![PyValue::int(1), PyValue::int(2)]);
            (before, after)
        }
    }

    #[test]
    fn execute_reports_mutation() {
        let mut harness = EchoHarness;
        let response = harness.execute(ExecutionRequest {
            request_id: "r1".to_string(),
            watch_ids: vec![],
        });
        assert_eq!(response.request_id, "r1");
        assert_eq!(response.mutated_ids.len(), 1);
    }
}
