//! `IgniteProvider` tests: argument construction, listing, deletion and the
//! shell-string transport.

#![allow(clippy::unwrap_used)]

use std::path::Path;
use std::time::Duration;

use kindle_cli::application::ports::{ImagePuller, LaunchRequest, Node, NodeLauncher, Provider};
use kindle_cli::application::services::planner::ExecutionPolicy;
use kindle_cli::application::services::retry::LinearBackoff;
use kindle_cli::domain::CommandError;
use kindle_cli::infra::ignite::{IgniteProvider, run_args};
use kindle_common::{NodeRole, NodeSpec, PortMapping, PortProtocol};

use crate::helpers::{MockCommandRunner, err_output, ok_output};

const NO_BACKOFF: LinearBackoff = LinearBackoff::new(0, Duration::ZERO);

fn provider(runner: &MockCommandRunner) -> IgniteProvider<MockCommandRunner> {
    IgniteProvider::new(runner.clone(), "ignite", NO_BACKOFF)
}

/// Answers `ps` with a single control-plane VM of cluster `kind`.
fn single_vm(call: &crate::helpers::Call) -> std::io::Result<std::process::Output> {
    if call.starts_with(&["ps"]) {
        Ok(ok_output(b"kind-control-plane kind\n"))
    } else {
        Ok(ok_output(b""))
    }
}

#[test]
fn vms_are_created_one_at_a_time() {
    let runner = MockCommandRunner::succeeding();
    assert_eq!(provider(&runner).options().policy, ExecutionPolicy::Sequential);
}

#[test]
fn run_args_carry_resources_labels_and_runtime() {
    let mut spec = NodeSpec::new(NodeRole::ControlPlane);
    spec.extra_port_mappings.push(PortMapping {
        listen_address: "127.0.0.1".to_string(),
        host_port: 0,
        container_port: 6443,
        protocol: PortProtocol::Tcp,
    });
    let request = LaunchRequest {
        name: "kind-control-plane",
        cluster: "kind",
        spec: &spec,
    };
    let args = run_args(&request).join(" ");
    assert!(args.starts_with("run --name kind-control-plane --cpus 1 --memory 2GB"), "{args}");
    assert!(args.contains("--size 10G --ssh"));
    assert!(args.contains("--label kindle.role=control-plane --label kindle.cluster=kind"));
    assert!(args.contains("--runtime=docker --network-plugin=docker-bridge"));
    assert!(args.contains("--ports 127.0.0.1:6443:6443/tcp"), "{args}");
    assert!(args.ends_with(&spec.image));
}

#[test]
fn run_args_honour_kernel_image() {
    let mut spec = NodeSpec::new(NodeRole::Worker);
    spec.kernel_image = Some("example/kernel:6.1".to_string());
    let request = LaunchRequest {
        name: "kind-worker",
        cluster: "kind",
        spec: &spec,
    };
    let args = run_args(&request);
    let pos = args.iter().position(|a| a == "--kernel-image").unwrap();
    assert_eq!(args[pos + 1], "example/kernel:6.1");
}

#[tokio::test]
async fn launch_failure_is_reported_as_run_error() {
    let runner = MockCommandRunner::new(|_| Ok(err_output(1, b"no space left")));
    let spec = NodeSpec::new(NodeRole::Worker);
    let request = LaunchRequest {
        name: "kind-worker",
        cluster: "kind",
        spec: &spec,
    };
    let err = provider(&runner).launch(&request).await.unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("ignite run error"), "{message}");
    assert!(message.contains("no space left"), "{message}");
}

#[tokio::test]
async fn list_clusters_is_sorted_and_deduplicated() {
    let runner = MockCommandRunner::new(|_| Ok(ok_output(b"beta\nalpha\nbeta\n")));
    let clusters = provider(&runner).list_clusters().await.unwrap();
    assert_eq!(clusters, ["alpha", "beta"]);

    let call = &runner.calls()[0];
    assert_eq!(call.program, "ignite");
    assert!(call.starts_with(&["ps", "-a", "--filter"]));
}

#[tokio::test]
async fn list_nodes_matches_cluster_label_exactly() {
    let runner = MockCommandRunner::new(|_| {
        Ok(ok_output(b"kind-control-plane kind\nkind2-control-plane kind2\n"))
    });
    let nodes = provider(&runner).list_nodes("kind").await.unwrap();
    let names: Vec<&str> = nodes.iter().map(Node::name).collect();
    assert_eq!(names, ["kind-control-plane"]);
}

#[tokio::test]
async fn delete_of_no_nodes_runs_nothing() {
    let runner = MockCommandRunner::succeeding();
    provider(&runner).delete_nodes(&[]).await.unwrap();
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn delete_removes_all_nodes_in_one_call() {
    let runner = MockCommandRunner::new(|call| {
        if call.starts_with(&["ps"]) {
            Ok(ok_output(b"kind-control-plane kind\nkind-worker kind\n"))
        } else {
            Ok(ok_output(b""))
        }
    });
    let provider = provider(&runner);
    let nodes = provider.list_nodes("kind").await.unwrap();
    provider.delete_nodes(&nodes).await.unwrap();

    let rm = runner.calls_starting_with(&["rm"]);
    assert_eq!(rm.len(), 1);
    assert_eq!(rm[0].args, ["rm", "-f", "kind-control-plane", "kind-worker"]);
}

#[tokio::test]
async fn exec_joins_argv_and_env_into_one_shell_string() {
    let runner = MockCommandRunner::new(single_vm);
    let provider = provider(&runner);
    let nodes = provider.list_nodes("kind").await.unwrap();
    nodes[0]
        .command("kubectl", &["get", "pods"])
        .env("GREETING", "hello world")
        .run()
        .await
        .unwrap();

    let exec = runner.calls_starting_with(&["--runtime=docker"]);
    assert_eq!(
        exec[0].args,
        [
            "--runtime=docker",
            "--network-plugin=docker-bridge",
            "exec",
            "kind-control-plane",
            "env 'GREETING=hello world' kubectl get pods",
        ]
    );
}

#[tokio::test]
async fn copy_from_stdin_is_staged_through_a_temp_file() {
    let runner = MockCommandRunner::new(|call| {
        if call.starts_with(&["ps"]) {
            return Ok(ok_output(b"kind-control-plane kind\n"));
        }
        // The staged file must exist and hold the input while `cp` runs.
        let staged = std::fs::read(&call.args[1]).unwrap_or_default();
        if staged == b"kind: Config" {
            Ok(ok_output(b""))
        } else {
            Ok(err_output(1, b"staged file missing"))
        }
    });
    let provider = provider(&runner);
    let nodes = provider.list_nodes("kind").await.unwrap();
    nodes[0]
        .command("cp", &["/dev/stdin", "/kind/kubeadm.conf"])
        .stdin(b"kind: Config".to_vec())
        .run()
        .await
        .unwrap();

    let cp = runner.calls_starting_with(&["cp"]);
    assert_eq!(cp.len(), 1);
    assert_eq!(cp[0].args[2], "kind-control-plane:/kind/kubeadm.conf");
    assert!(cp[0].args[1].contains("kindle-file-"));
    assert!(!Path::new(&cp[0].args[1]).exists(), "staged file must be removed");
}

#[tokio::test]
async fn copy_without_destination_is_invalid() {
    let runner = MockCommandRunner::new(single_vm);
    let provider = provider(&runner);
    let nodes = provider.list_nodes("kind").await.unwrap();
    let err = nodes[0].command("cp", &["/only/source"]).run().await.unwrap_err();
    assert!(!err.is_retryable());
    assert!(runner.calls_starting_with(&["cp"]).is_empty());
}

#[tokio::test]
async fn started_command_pipes_stdin_to_exec() {
    let runner = MockCommandRunner::new(single_vm);
    let provider = provider(&runner);
    let nodes = provider.list_nodes("kind").await.unwrap();
    let started = nodes[0]
        .command("kubectl", &["apply", "-f", "-"])
        .stdin(b"kind: Pod".to_vec())
        .start();
    // The mock cannot hand back a process; the recorded call is what matters.
    assert!(started.is_err());

    let exec = runner.calls_starting_with(&["--runtime=docker"]);
    assert_eq!(exec.len(), 1);
    assert_eq!(exec[0].args[4], "kubectl apply -f -");
    assert_eq!(exec[0].stdin.as_deref(), Some(&b"kind: Pod"[..]));
}

#[tokio::test]
async fn started_copy_is_invalid() {
    let runner = MockCommandRunner::new(single_vm);
    let provider = provider(&runner);
    let nodes = provider.list_nodes("kind").await.unwrap();
    let err = nodes[0]
        .command("cp", &["/dev/stdin", "/kind/kubeadm.conf"])
        .stdin(b"kind: Config".to_vec())
        .start()
        .unwrap_err();
    assert!(matches!(err, CommandError::Invalid { .. }), "{err}");
    assert!(runner.calls_starting_with(&["cp"]).is_empty());
    assert!(runner.calls_starting_with(&["--runtime=docker"]).is_empty());
}

#[tokio::test]
async fn role_and_ip_are_read_from_inspect() {
    let runner = MockCommandRunner::new(|call| {
        if call.starts_with(&["ps"]) {
            Ok(ok_output(b"kind-control-plane kind\n"))
        } else if call.args.iter().any(|a| a == "--template") {
            Ok(ok_output(b"control-plane\n"))
        } else {
            Ok(ok_output(
                br#"{"status":{"running":true,"ipAddresses":["172.17.0.2"]}}"#,
            ))
        }
    });
    let provider = provider(&runner);
    let nodes = provider.list_nodes("kind").await.unwrap();
    assert_eq!(nodes[0].role().await.unwrap(), NodeRole::ControlPlane);
    assert_eq!(nodes[0].ip().await.unwrap().ipv4.as_deref(), Some("172.17.0.2"));
    assert_eq!(
        provider.api_server_endpoint("kind").await.unwrap(),
        "172.17.0.2:6443"
    );
}

#[tokio::test]
async fn missing_role_label_is_an_error() {
    let runner = MockCommandRunner::new(|call| {
        if call.starts_with(&["ps"]) {
            Ok(ok_output(b"kind-control-plane kind\n"))
        } else {
            Ok(ok_output(b"<no value>\n"))
        }
    });
    let nodes = provider(&runner).list_nodes("kind").await.unwrap();
    let err = nodes[0].role().await.unwrap_err();
    assert!(format!("{err:#}").contains("failed to get role for node"));
}

#[tokio::test]
async fn image_import_uses_docker_runtime() {
    let runner = MockCommandRunner::succeeding();
    provider(&runner)
        .pull_image("kindest/node:v1.29.2")
        .await
        .unwrap();
    assert_eq!(
        runner.calls()[0].args,
        ["image", "import", "kindest/node:v1.29.2", "--runtime=docker"]
    );
}
