use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use marketroles_core::{ExpectedVersion, InternalCommandPayload, ProcessId, TransactionId};
use marketroles_infra::outbox::CommandScheduler;
use marketroles_infra::processes::receive_move_in;
use marketroles_infra::runtime::build_processor;
use marketroles_infra::{
    CommandOutcome, CommandProcessor, CommandRouter, CommandStore, HandlerContext,
    InMemoryDatabase, MarketConfig, ProcessorConfig,
};
use marketroles_processes::{AccountingPoint, Gsrn, RequestMoveIn};

const GSRN: &str = "571313123456789018";
const SUPPLIER: &str = "5799000000008";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Ping {
    remaining: u32,
}

impl InternalCommandPayload for Ping {
    const KIND: &'static str = "Ping";
}

/// Completes every Ping, enqueueing a follow-up while `remaining > 0`.
fn ping_router() -> CommandRouter {
    let mut router = CommandRouter::new();
    router
        .register(|ping: Ping, ctx: &mut HandlerContext<'_>| {
            if ping.remaining > 0 {
                ctx.enqueue(&Ping {
                    remaining: ping.remaining - 1,
                })?;
            }
            Ok(CommandOutcome::Completed)
        })
        .unwrap();
    router
}

fn seeded_pings(count: usize) -> InMemoryDatabase {
    let db = InMemoryDatabase::new();
    let mut uow = db.begin().unwrap();
    for _ in 0..count {
        uow.enqueue(&Ping { remaining: 0 }).unwrap();
    }
    uow.commit().unwrap();
    db
}

fn bench_drain_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain_throughput");

    for count in [10usize, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("independent_commands", count), count, |b, &count| {
            b.iter_batched(
                || seeded_pings(count),
                |db| {
                    let processor = CommandProcessor::new(db, ping_router(), ProcessorConfig::default());
                    black_box(processor.drain().unwrap());
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_follow_up_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("follow_up_chain");

    for depth in [10u32, 100, 1000].iter() {
        group.throughput(Throughput::Elements(u64::from(*depth) + 1));
        group.bench_with_input(BenchmarkId::new("chain_depth", depth), depth, |b, &depth| {
            b.iter_batched(
                || {
                    let db = InMemoryDatabase::new();
                    let mut uow = db.begin().unwrap();
                    uow.enqueue(&Ping { remaining: depth }).unwrap();
                    uow.commit().unwrap();
                    db
                },
                |db| {
                    let processor = CommandProcessor::new(db, ping_router(), ProcessorConfig::default());
                    black_box(processor.drain().unwrap());
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Requests on distinct dates, so none is rejected for a same-date conflict.
fn seeded_move_ins(count: u64) -> InMemoryDatabase {
    let db = InMemoryDatabase::new();
    let base = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

    let mut uow = db.begin().unwrap();
    uow.accounting_points()
        .save(AccountingPoint::new(Gsrn::parse(GSRN).unwrap()), ExpectedVersion::Exact(0))
        .unwrap();
    for i in 0..count {
        let request = RequestMoveIn {
            transaction_id: TransactionId::new(format!("tx-{i}")).unwrap(),
            process_id: ProcessId::new(format!("P{i}")).unwrap(),
            accounting_point_id: GSRN.to_string(),
            energy_supplier_gln: SUPPLIER.to_string(),
            sender_gln: SUPPLIER.to_string(),
            effective_date: base.checked_add_days(Days::new(i)).unwrap(),
        };
        receive_move_in(uow.as_mut(), &request).unwrap();
    }
    uow.commit().unwrap();
    db
}

fn bench_move_in_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("move_in_pipeline");
    let market = MarketConfig::from_lookup(|_| None).unwrap();

    for count in [10u64, 100].iter() {
        // Each request is confirmed and then effectuated.
        group.throughput(Throughput::Elements(count * 2));
        group.bench_with_input(BenchmarkId::new("request_and_effectuate", count), count, |b, &count| {
            b.iter_batched(
                || seeded_move_ins(count),
                |db| {
                    let processor =
                        build_processor(db, ProcessorConfig::default(), &market).unwrap();
                    black_box(processor.drain().unwrap());
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_drain_throughput,
    bench_follow_up_chain,
    bench_move_in_pipeline
);
criterion_main!(benches);
