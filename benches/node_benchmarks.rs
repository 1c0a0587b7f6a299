use criterion::{black_box, criterion_group, criterion_main, Criterion};
use k8s_openapi::api::core::v1::{Node, NodeAddress, NodeCondition, NodeStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use node_metrics_agent::endpoints::{DirectNode, NodeApi, ProxyApi};
use node_metrics_agent::nodes::{filter_ready_nodes, node_address};

fn fleet(size: usize) -> Vec<Node> {
    (0..size)
        .map(|i| Node {
            metadata: ObjectMeta {
                name: Some(format!("node-{}", i)),
                ..Default::default()
            },
            status: Some(NodeStatus {
                conditions: Some(vec![NodeCondition {
                    type_: "Ready".to_string(),
                    status: if i % 10 == 0 { "False" } else { "True" }.to_string(),
                    ..Default::default()
                }]),
                addresses: Some(vec![NodeAddress {
                    type_: "InternalIP".to_string(),
                    address: format!("10.0.{}.{}", i / 256, i % 256),
                }]),
                ..Default::default()
            }),
            ..Default::default()
        })
        .collect()
}

fn ready_filter_benchmark(c: &mut Criterion) {
    let nodes = fleet(1000);

    c.bench_function("filter_ready_nodes", |b| {
        b.iter(|| black_box(filter_ready_nodes(black_box(nodes.clone()))))
    });
}

fn endpoint_builder_benchmark(c: &mut Criterion) {
    let nodes = fleet(100);

    c.bench_function("endpoint_urls", |b| {
        b.iter(|| {
            for node in &nodes {
                if let Ok((ip, port)) = node_address(node) {
                    let direct = DirectNode::new(ip, port);
                    black_box(direct.stats_summary());
                    black_box(direct.cadvisor_metrics());
                }
                let proxy = ProxyApi::new("https://api.cluster:443", node.metadata.name.as_deref().unwrap_or(""));
                black_box(proxy.stats_container());
            }
        })
    });
}

criterion_group!(benches, ready_filter_benchmark, endpoint_builder_benchmark);
criterion_main!(benches);
