use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use etl_orchestra::{pipeline_fn, Configuration, PipelineError, ProcessContextFactory, Target};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn configuration(pipelines: usize) -> Arc<Configuration> {
    let configuration = Configuration::new();
    for i in 0..pipelines {
        configuration
            .register_pipeline(Arc::new(pipeline_fn(format!("step_{}", i), |_context| async {
                tokio::task::yield_now().await;
                Ok::<(), PipelineError>(())
            })))
            .unwrap();
    }
    Arc::new(configuration)
}

// Half of the pipelines run in parallel, the other half in a sequence,
// all of it inside a transaction
async fn run_tree(configuration: Arc<Configuration>, pipelines: usize) {
    let mut target = Target::new("bench", configuration).unwrap();
    target
        .transaction(|commands| {
            commands.parallel(|commands| {
                for i in 0..pipelines / 2 {
                    commands.execute(&format!("step_{}", i))?;
                }
                Ok(())
            })?;
            commands.sequence(|commands| {
                for i in pipelines / 2..pipelines {
                    commands.execute(&format!("step_{}", i))?;
                }
                Ok(())
            })
        })
        .unwrap();

    target
        .run(Arc::new(ProcessContextFactory::current().unwrap()))
        .unwrap();
    target.wait_for_completion().await.unwrap();
    assert!(target.execution_result().is_success());
}

fn bench_target_execution(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("target_execution");

    for pipelines in [4usize, 32, 256] {
        group.throughput(Throughput::Elements(pipelines as u64));
        group.bench_with_input(
            BenchmarkId::new("nested_tree", pipelines),
            &pipelines,
            |b, &pipelines| {
                b.iter(|| {
                    // Target names are unique per configuration
                    let configuration = configuration(pipelines);
                    runtime.block_on(run_tree(configuration, pipelines));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_target_execution);
criterion_main!(benches);
