// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use entity_locker::locking::{EntityLocker, EscalationPolicy};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_millis(500);

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended");
    let locker = EntityLocker::new().with_escalation(EscalationPolicy::disabled());
    let session = locker.session();

    group.bench_function("lock_unlock_same_key", |b| {
        b.iter(|| {
            session.try_lock(black_box(&1u64), TIMEOUT).unwrap();
            session.unlock(&1).unwrap();
        })
    });

    group.bench_function("reentrant_depth_4", |b| {
        b.iter(|| {
            for _ in 0..4 {
                session.try_lock(black_box(&2u64), TIMEOUT).unwrap();
            }
            for _ in 0..4 {
                session.unlock(&2).unwrap();
            }
        })
    });

    group.bench_function("global_lock_release", |b| {
        b.iter(|| {
            session.try_lock_global(TIMEOUT).unwrap();
            session.release_global().unwrap();
        })
    });

    let mut next = 0u64;
    group.bench_function("fresh_key", |b| {
        b.iter(|| {
            next += 1;
            session.try_lock(&next, TIMEOUT).unwrap();
            session.unlock(&next).unwrap();
        })
    });

    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended");
    group.sample_size(20);

    for threads in [2usize, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("shared_key", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let locker =
                        Arc::new(EntityLocker::new().with_escalation(EscalationPolicy::disabled()));
                    let handles: Vec<_> = (0..threads)
                        .map(|_| {
                            let locker = Arc::clone(&locker);
                            thread::spawn(move || {
                                let session = locker.session();
                                for _ in 0..100 {
                                    session.try_lock(&0u64, TIMEOUT).unwrap();
                                    session.unlock(&0).unwrap();
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_uncontended, bench_contended);
criterion_main!(benches);
