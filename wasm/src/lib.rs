use alloy_trace_graph::layout_dump::trace_dump_json;
use alloy_trace_graph::{LayoutConfig, Theme, Trace, build_trace_graphs_with_config};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TraceGraphOptions {
    theme: Option<Theme>,
    layout: Option<LayoutConfig>,
}

fn build_json(trace_json: &str, options_json: Option<&str>) -> Result<String, String> {
    let trace: Trace = serde_json::from_str(trace_json).map_err(|error| error.to_string())?;
    let options = match options_json {
        Some(raw) => serde_json::from_str::<TraceGraphOptions>(raw).map_err(|error| error.to_string())?,
        None => TraceGraphOptions::default(),
    };
    let layout = options.layout.unwrap_or_default();
    let graphs = build_trace_graphs_with_config(&trace, options.theme.as_ref(), &layout)
        .map_err(|error| error.to_string())?;
    trace_dump_json(&graphs).map_err(|error| error.to_string())
}

/// Builds every graph of a trace and returns the layout dump as JSON.
/// `options_json` may carry `{"theme": ..., "layout": ...}`.
#[wasm_bindgen]
pub fn build_trace_graphs_json(trace_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    build_json(trace_json, options_json.as_deref()).map_err(|error| JsValue::from_str(&error))
}
