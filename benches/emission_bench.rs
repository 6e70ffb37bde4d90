use chrono::{DateTime, TimeZone, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal_macros::dec;

use emissao::core::*;
use emissao::payload;
use emissao::tax;

fn issued_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

fn issuer() -> IssuerProfile {
    IssuerBuilder::new(
        "bench",
        PartyBuilder::new(
            "Fazenda Benchmark Ltda",
            AddressBuilder::new("Rod. MT-130", "Zona Rural", "Primavera do Leste", "MT", "78850-000")
                .build(),
        )
        .identifier("11.222.333/0001-81")
        .build(),
    )
    .regime(TaxRegime::Normal)
    .build()
}

fn build_context(lines: u32) -> EmissionContext {
    let mut builder = DocumentBuilder::new("BENCH-001", issued_at())
        .nature("Venda de produção do estabelecimento")
        .recipient(
            PartyBuilder::new(
                "Armazém Central S.A.",
                AddressBuilder::new("Av. Paulista", "Bela Vista", "São Paulo", "SP", "01310-100")
                    .number("1000")
                    .build(),
            )
            .identifier("11.444.777/0001-61")
            .state_registration("111.222.333.444")
            .build(),
        )
        .freight(FreightMode::ByIssuer, dec!(1500))
        .payment(PaymentMethod::BankSlip);

    for i in 1..=lines {
        builder = builder.add_line(
            LineBuilder::new(i, format!("P{i}"), format!("Produto {i}"), dec!(60), dec!(119.90))
                .ncm("12019000")
                .cfop("6101", TaxIncidence::ALL)
                .discount(dec!(10))
                .build(),
        );
    }

    builder.build(issuer()).unwrap()
}

fn bench_resolve_line(c: &mut Criterion) {
    let rates = RateTable::default();
    let codes = SituationCodes::new();
    let input = tax::TaxInput {
        line_total: dec!(7184.00),
        regime: TaxRegime::Normal,
        rates: &rates,
        incidence: TaxIncidence::ALL,
        operation_codes: &codes,
        product_override: None,
        issuer_state: "MT",
        destination_state: "SP",
        origin: ProductOrigin::National,
    };
    c.bench_function("resolve_line_taxes", |b| {
        b.iter(|| black_box(tax::resolve_line(black_box(&input))));
    });
}

fn bench_validate(c: &mut Criterion) {
    let ctx = build_context(10);
    c.bench_function("validate_emission_10_lines", |b| {
        b.iter(|| black_box(validate_emission(black_box(&ctx))));
    });
}

fn bench_build_payload(c: &mut Criterion) {
    let ctx = build_context(10);
    c.bench_function("build_payload_10_lines", |b| {
        b.iter(|| black_box(payload::build_payload(black_box(&ctx))));
    });

    let big = build_context(990);
    c.bench_function("build_payload_990_lines", |b| {
        b.iter(|| black_box(payload::build_payload(black_box(&big))));
    });
}

fn bench_serialize_payload(c: &mut Criterion) {
    let built = payload::build_payload(&build_context(10)).unwrap();
    c.bench_function("serialize_payload_10_lines", |b| {
        b.iter(|| black_box(serde_json::to_vec(black_box(&built.payload))));
    });
}

criterion_group!(
    benches,
    bench_resolve_line,
    bench_validate,
    bench_build_payload,
    bench_serialize_payload,
);
criterion_main!(benches);
