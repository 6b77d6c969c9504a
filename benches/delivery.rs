use criterion::{criterion_group, criterion_main, Criterion};

fn test_message(subject: &str) -> Vec<u8> {
    format!("To: somebody@host\r\nFrom: somebodyelse@host\r\nSubject: {subject}\r\n\r\nTest Body\r\n")
        .into_bytes()
}

fn bench_append(c: &mut Criterion) {
    let tmp = tempfile::tempdir().unwrap();
    let store = mailstash::MailStore::open(tmp.path()).unwrap();
    let mb = store.mailbox_for("bench");
    let msg = test_message("benchmark");

    c.bench_function("append_then_delete", |b| {
        b.iter(|| {
            let id = mb.append(&msg, chrono::Utc::now()).unwrap();
            mb.delete(&id).unwrap();
        })
    });
}

fn bench_list(c: &mut Criterion) {
    let tmp = tempfile::tempdir().unwrap();
    let store = mailstash::MailStore::open(tmp.path()).unwrap();
    let mb = store.mailbox_for("bench");
    for i in 0..500 {
        mb.append(&test_message(&format!("message {i}")), chrono::Utc::now())
            .unwrap();
    }

    c.bench_function("list_500", |b| b.iter(|| mb.list().unwrap().len()));
}

criterion_group!(benches, bench_append, bench_list);
criterion_main!(benches);
