#![cfg(feature = "payload")]

use chrono::{TimeZone, Utc};
use emissao::core::*;
use emissao::payload::*;
use rust_decimal_macros::dec;

fn issuer(state: &str) -> IssuerProfile {
    IssuerBuilder::new(
        "fazenda-boa-vista",
        PartyBuilder::new(
            "Fazenda Boa Vista Ltda",
            AddressBuilder::new("Rod. MT-130", "Zona Rural", "Primavera do Leste", state, "78850-000")
                .build(),
        )
        .identifier("11.222.333/0001-81")
        .state_registration("13.123.456-7")
        .phone("(66) 3498-1100")
        .build(),
    )
    .regime(TaxRegime::Normal)
    .build()
}

fn company(state: &str) -> Party {
    PartyBuilder::new(
        "Armazém Central S.A.",
        AddressBuilder::new("Av. Brasil", "Centro", "Rondonópolis", state, "78700-000")
            .number("100")
            .build(),
    )
    .identifier("11.444.777/0001-61")
    .state_registration("13.555.666-0")
    .build()
}

fn line(number: u32, quantity: rust_decimal::Decimal, price: rust_decimal::Decimal) -> DocumentLine {
    LineBuilder::new(number, "SOJA", "Soja em grãos", quantity, price)
        .ncm("1201.90.00")
        .cfop("5.101", TaxIncidence::ALL)
        .unit("SC")
        .build()
}

fn context() -> EmissionContext {
    DocumentBuilder::new("doc-1", Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
        .nature("Venda de produção do estabelecimento")
        .recipient(company("MT"))
        .add_line(line(1, dec!(1000), dec!(120)))
        .add_line(
            LineBuilder::new(2, "MILHO", "Milho em grãos", dec!(333), dec!(57.33))
                .ncm("10059010")
                .cfop("5101", TaxIncidence::ALL)
                .discount(dec!(12.34))
                .build(),
        )
        .freight(FreightMode::ByRecipient, dec!(450.50))
        .payment(PaymentMethod::Pix)
        .build(issuer("MT"))
        .unwrap()
}

#[test]
fn payload_total_matches_derived_total() {
    let built = build_payload(&context()).unwrap();
    let payload = &built.payload;
    assert!((payload.derived_total() - payload.valor_total).abs() <= dec!(0.01));
    assert_eq!(payload.formas_pagamento.len(), 1);
    assert_eq!(payload.formas_pagamento[0].forma_pagamento, "17");
    assert_eq!(payload.formas_pagamento[0].valor_pagamento, payload.valor_total);
}

#[test]
fn payload_survives_json() {
    let built = build_payload(&context()).unwrap();
    let json = serde_json::to_string(&built.payload).unwrap();
    let parsed: NfePayload = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, built.payload);
    assert!((parsed.derived_total() - parsed.valor_total).abs() <= dec!(0.01));
}

#[test]
fn flat_field_names_and_digits() {
    let built = build_payload(&context()).unwrap();
    let json = serde_json::to_value(&built.payload).unwrap();

    assert_eq!(json["cnpj_emitente"], "11222333000181");
    assert!(json.get("cpf_emitente").is_none());
    assert_eq!(json["cep_emitente"], "78850000");
    assert_eq!(json["telefone_emitente"], "6634981100");
    assert_eq!(json["numero_emitente"], NO_STREET_NUMBER);
    assert_eq!(json["cnpj_destinatario"], "11444777000161");
    assert_eq!(json["numero_destinatario"], "100");
    assert_eq!(json["indicador_inscricao_estadual_destinatario"], 1);
    assert_eq!(json["local_destino"], 1);
    assert_eq!(json["consumidor_final"], 0);
    assert_eq!(json["modalidade_frete"], 1);
    assert_eq!(json["regime_tributario_emitente"], 3);
    assert!(json.get("serie").is_none());
    assert!(json.get("notas_referenciadas").is_none());

    let item = &json["items"][0];
    assert_eq!(item["codigo_ncm"], "12019000");
    assert_eq!(item["cfop"], "5101");
    assert_eq!(item["unidade_comercial"], "SC");
}

#[test]
fn items_follow_line_number_order() {
    let ctx = DocumentBuilder::new("doc-2", Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
        .nature("Venda")
        .recipient(company("MT"))
        .add_line(line(2, dec!(1), dec!(10)))
        .add_line(line(1, dec!(1), dec!(20)))
        .build(issuer("MT"))
        .unwrap();
    let built = build_payload(&ctx).unwrap();
    let numbers: Vec<u32> = built.payload.items.iter().map(|i| i.numero_item).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(built.payload.items[0].valor_bruto, dec!(20));
}

#[test]
fn taxes_flow_into_items_and_totals() {
    let built = build_payload(&context()).unwrap();
    let first = &built.payload.items[0];
    assert_eq!(first.icms_situacao_tributaria, "00");
    assert_eq!(first.icms_aliquota, dec!(18));
    assert_eq!(first.icms_valor, dec!(21600.00));
    assert_eq!(first.pis_valor, dec!(1980.00));
    assert_eq!(first.cofins_valor, dec!(9120.00));

    let item_pis: rust_decimal::Decimal = built.payload.items.iter().map(|i| i.pis_valor).sum();
    assert_eq!(built.payload.valor_pis, item_pis);
    assert_eq!(built.payload.valor_pis, built.tax_totals.pis);
    assert_eq!(built.line_taxes.len(), 2);
}

#[test]
fn interstate_sale_uses_interstate_rate() {
    let ctx = DocumentBuilder::new("doc-3", Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
        .nature("Venda")
        .recipient(company("SP"))
        .add_line(line(1, dec!(10), dec!(100)))
        .build(issuer("MT"))
        .unwrap();
    let built = build_payload(&ctx).unwrap();
    assert_eq!(built.payload.local_destino, 2);
    assert_eq!(built.payload.items[0].icms_aliquota, dec!(12));
    assert_eq!(built.payload.icms_valor_total, dec!(120.00));
}

#[test]
fn individual_recipient_is_final_consumer() {
    let recipient = PartyBuilder::new(
        "João da Silva",
        AddressBuilder::new("Rua das Flores", "Centro", "Cuiabá", "MT", "78005-000").build(),
    )
    .identifier("529.982.247-25")
    .build();
    let ctx = DocumentBuilder::new("doc-4", Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
        .nature("Venda")
        .recipient(recipient)
        .add_line(line(1, dec!(1), dec!(50)))
        .build(issuer("MT"))
        .unwrap();
    let payload = build_payload(&ctx).unwrap().payload;
    assert_eq!(payload.cpf_destinatario.as_deref(), Some("52998224725"));
    assert!(payload.cnpj_destinatario.is_none());
    assert_eq!(payload.consumidor_final, 1);
    assert_eq!(payload.indicador_inscricao_estadual_destinatario, 9);
    assert!(payload.inscricao_estadual_destinatario.is_none());
}

#[test]
fn invalid_context_yields_every_error() {
    let mut ctx = context();
    ctx.document.recipient.identifier = None;
    ctx.lines[1].ncm.clear();
    let errors = build_payload(&ctx).unwrap_err();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].field, "recipient.identifier");
    assert_eq!(errors[1].field, "lines[1].ncm");
}

#[test]
fn referenced_documents_json() {
    let ctx = DocumentBuilder::new("doc-5", Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
        .nature("Devolução")
        .purpose(Purpose::Return)
        .recipient(company("MT"))
        .add_line(line(1, dec!(1), dec!(50)))
        .add_reference(ReferencedDocument::Electronic {
            access_key: "51240611222333000181550010000001231000001234".into(),
        })
        .add_reference(ReferencedDocument::Producer(ProducerReference {
            state: "mt".into(),
            period: "2406".into(),
            identifier: "111.444.777-35".into(),
            state_registration: "13.999.888-1".into(),
            series: "1".into(),
            number: "77".into(),
        }))
        .build(issuer("MT"))
        .unwrap();
    let payload = build_payload(&ctx).unwrap().payload;
    assert_eq!(payload.finalidade_emissao, 4);

    let json = serde_json::to_string(&payload.notas_referenciadas).unwrap();
    insta::assert_snapshot!(json, @r#"[{"chave_nfe":"51240611222333000181550010000001231000001234"},{"uf":"MT","mes":"2406","cpf":"11144477735","inscricao_estadual":"13.999.888-1","serie":"1","numero":"77","modelo":"04"}]"#);
}
