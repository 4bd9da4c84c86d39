//! Driving the engine through the `v1/*` JSON surface.

use rasterflow_codecs::InputBytes;
use rasterflow_core::{IoId, PixelFormat};
use rasterflow_engine::Context;
use rasterflow_test_utils::{gradient_byte, gradient_raw_image, parse_raw_image};

fn context_with_gradient(w: u32, h: u32) -> Context {
    let mut ctx = Context::new();
    ctx.add_input_buffer(
        IoId(0),
        InputBytes::Owned(gradient_raw_image(w, h, PixelFormat::Bgra32)),
    )
    .unwrap();
    ctx.add_output_buffer(IoId(1)).unwrap();
    ctx
}

fn assert_ok(response: &rasterflow_engine::JsonResponse) -> serde_json::Value {
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(
        response.status_code, 200,
        "expected success, got {body}"
    );
    assert_eq!(body["success"], true);
    body
}

#[test]
fn build_then_execute_scales_through_json() {
    let mut ctx = context_with_gradient(100, 50);

    let build = ctx.send_json(
        "v1/build",
        br#"{ "graph": { "nodes": [
            {"type": "decode", "io_id": 0},
            {"type": "scale", "w": 25, "h": 12},
            {"type": "encode", "io_id": 1, "codec": "raw"}
        ]}}"#,
    );
    assert_ok(&build);

    let execute = ctx.send_json("v1/execute", b"{}");
    let body = assert_ok(&execute);
    assert_eq!(body["data"]["io"][0]["io_id"], 1);
    assert!(body["data"]["io"][0]["bytes"].as_u64().unwrap() > 0);

    let out = parse_raw_image(ctx.get_output_buffer(IoId(1)).unwrap());
    assert_eq!((out.width, out.height), (25, 12));
    assert!(!ctx.has_error());
}

#[test]
fn placeholders_bind_through_the_io_list() {
    let mut ctx = context_with_gradient(6, 4);

    let build = ctx.send_json(
        "v1/build",
        br#"{ "graph": { "nodes": [
            {"type": "placeholder", "index": 0},
            {"type": "flip_v"},
            {"type": "placeholder", "index": 1}
        ]},
        "io": [
            {"placeholder_id": 0, "io_id": 0},
            {"placeholder_id": 1, "io_id": 1}
        ]}"#,
    );
    assert_ok(&build);
    assert_ok(&ctx.send_json("v1/execute", b"{}"));

    let out = parse_raw_image(ctx.get_output_buffer(IoId(1)).unwrap());
    assert_eq!((out.width, out.height), (6, 4));
    assert_eq!(out.pixel(2, 0)[0], gradient_byte(2, 3, 0));
}

#[test]
fn crop_errors_map_to_http_400_with_error_body() {
    let mut ctx = context_with_gradient(5, 5);

    assert_ok(&ctx.send_json(
        "v1/build",
        br#"{ "graph": { "nodes": [
            {"type": "decode", "io_id": 0},
            {"type": "crop", "x1": 0, "y1": 0, "x2": 10, "y2": 10},
            {"type": "encode", "io_id": 1}
        ]}}"#,
    ));

    let response = ctx.send_json("v1/execute", b"{}");
    assert_eq!(response.status_code, 400);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["kind"], "InvalidArgument");
    assert_eq!(body["error"]["code"], 50);
    assert!(ctx.has_error());
}

#[test]
fn binding_an_unregistered_io_id_is_404() {
    let mut ctx = Context::new();
    let response = ctx.send_json(
        "v1/build",
        br#"{ "graph": { "nodes": [{"type": "placeholder", "index": 0}]},
             "io": [{"placeholder_id": 0, "io_id": 9}]}"#,
    );
    assert_eq!(response.status_code, 404);
}

#[test]
fn rotate_pipeline_round_trips_through_json() {
    let mut ctx = context_with_gradient(8, 4);

    assert_ok(&ctx.send_json(
        "v1/build",
        br#"{ "graph": { "nodes": [
            {"type": "decode", "io_id": 0},
            {"type": "rotate_90"},
            {"type": "rotate_270"},
            {"type": "encode", "io_id": 1}
        ]}}"#,
    ));
    assert_ok(&ctx.send_json("v1/execute", b"{}"));

    let out = parse_raw_image(ctx.get_output_buffer(IoId(1)).unwrap());
    assert_eq!((out.width, out.height), (8, 4));
    for y in 0..4 {
        for x in 0..8 {
            assert_eq!(out.pixel(x, y)[0], gradient_byte(x, y, 0));
        }
    }
}
