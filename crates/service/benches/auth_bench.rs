use std::collections::HashSet;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use uuid::Uuid;

use service::agenda::{select_new, AgendaRecord};
use service::auth::domain::{AuthUser, LoginInput, RegisterInput};
use service::auth::repository::mock::MockAuthRepository;
use service::auth::service::{AuthConfig, AuthService};
use service::auth::token::{issue_access_token, verify_access_token};

const SECRET: &str = "bench-secret-0123456789";

fn bench_login(c: &mut Criterion) {
    let repo = Arc::new(MockAuthRepository::default());
    let cfg = AuthConfig {
        jwt_secret: SECRET.into(),
        token_ttl: chrono::Duration::hours(1),
        reset_token_ttl: chrono::Duration::hours(24),
        password_algorithm: "argon2".into(),
    };
    let svc = AuthService::new(repo, cfg);

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(svc.register(RegisterInput {
        username: "jordi".into(),
        email: "jordi@example.com".into(),
        password: "Benchmark1".into(),
        confirm_password: "Benchmark1".into(),
    }))
    .unwrap();

    c.bench_function("auth_login_verify", |b| {
        b.iter(|| {
            rt.block_on(svc.login(LoginInput { username: "jordi".into(), password: "Benchmark1".into() })).unwrap();
        });
    });
}

// every protected request pays for one verification
fn bench_access_token(c: &mut Criterion) {
    let user = AuthUser { id: Uuid::new_v4(), username: "jordi".into(), email: "jordi@example.com".into() };
    let token = issue_access_token(SECRET, &user, chrono::Duration::hours(1)).unwrap();
    c.bench_function("access_token_verify", |b| {
        b.iter(|| verify_access_token(SECRET, black_box(&token)).unwrap());
    });
}

fn bench_agenda_dedup(c: &mut Criterion) {
    let page: Vec<AgendaRecord> = (0..1000)
        .map(|i| AgendaRecord {
            codi: Some(format!("{}", 20_000_000_000i64 + i % 700)),
            data_inici: Some(if i % 3 == 0 { "2019-06-01".into() } else { "2025-03-01T00:00:00.000".into() }),
            denominaci: Some(format!("Acte {i}")),
            ..Default::default()
        })
        .collect();
    c.bench_function("agenda_select_new_1000", |b| {
        b.iter(|| {
            let mut known = HashSet::new();
            select_new(black_box(page.clone()), &mut known, 2020)
        });
    });
}

criterion_group!(benches, bench_login, bench_access_token, bench_agenda_dedup);
criterion_main!(benches);
