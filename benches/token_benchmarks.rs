use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;

use authgate::auth::{SystemClock, TokenService};

const SECRET: &[u8] = b"benchmark-secret-0123456789abcdef";
const PRIVATE_PEM: &str = include_str!("../tests/fixtures/rsa_private.pem");

fn bench_hs256(c: &mut Criterion) {
    let tokens = TokenService::shared_secret(SECRET, Arc::new(SystemClock)).unwrap();

    c.bench_function("hs256_issue", |b| b.iter(|| tokens.issue(black_box(42))));

    let issued = tokens.issue(42).unwrap();
    c.bench_function("hs256_verify", |b| {
        b.iter(|| tokens.verify(black_box(&issued.token)))
    });
}

fn bench_rs256(c: &mut Criterion) {
    let tokens =
        TokenService::asymmetric(PRIVATE_PEM, "bench", &[], Arc::new(SystemClock)).unwrap();

    c.bench_function("rs256_issue", |b| b.iter(|| tokens.issue(black_box(42))));

    let issued = tokens.issue(42).unwrap();
    c.bench_function("rs256_verify", |b| {
        b.iter(|| tokens.verify(black_box(&issued.token)))
    });
}

fn bench_session_fields(c: &mut Criterion) {
    use authgate::auth::{Role, SessionRecord, SubscriptionStatus};
    use std::collections::HashMap;

    let record = SessionRecord {
        subject_id: 42,
        role: Role::Member,
        subscription_status: SubscriptionStatus::Active,
        name: Some("Alice".to_string()),
        email: Some("alice@example.com".to_string()),
    };

    c.bench_function("session_to_fields", |b| b.iter(|| black_box(&record).to_fields()));

    let fields: HashMap<String, String> = record
        .to_fields()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    c.bench_function("session_from_fields", |b| {
        b.iter(|| SessionRecord::from_fields(black_box(&fields)))
    });
}

criterion_group!(benches, bench_hs256, bench_rs256, bench_session_fields);
criterion_main!(benches);
