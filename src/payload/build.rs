use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::model::{NfePayload, PayloadItem, PayloadPayment, PayloadReference};
use crate::core::identifiers::{IdentifierKind, digits_only, infer_kind};
use crate::core::states::FOREIGN_STATE;
use crate::core::*;
use crate::tax::{TaxInput, TaxTotals, is_interstate, resolve_line, sum_taxes};

/// Street number sent when the address has none.
pub const NO_STREET_NUMBER: &str = "S/N";

/// Model code of a producer invoice reference (`refNFP/mod`).
pub const PRODUCER_INVOICE_MODEL: &str = "04";

/// A payload together with the taxes it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltPayload {
    pub payload: NfePayload,
    /// Resolved taxes, in line-number order.
    pub line_taxes: Vec<LineTaxes>,
    pub tax_totals: TaxTotals,
}

/// Validate the context and build the gateway payload.
///
/// Returns every validation error found; nothing is built unless the
/// context is clean.
pub fn build_payload(ctx: &EmissionContext) -> Result<BuiltPayload, Vec<ValidationError>> {
    let errors = validate_emission(ctx);
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut lines: Vec<&DocumentLine> = ctx.lines.iter().collect();
    lines.sort_by_key(|l| l.number);

    let line_taxes: Vec<LineTaxes> = lines.iter().map(|l| resolve_line_taxes(ctx, l)).collect();
    let tax_totals = sum_taxes(&line_taxes);

    let doc = &ctx.document;
    let issuer = &ctx.issuer.party;
    let recipient = &doc.recipient;
    let (cnpj_emitente, cpf_emitente) = split_identifier(issuer.identifier.as_deref());
    let (cnpj_destinatario, cpf_destinatario) = split_identifier(recipient.identifier.as_deref());
    let recipient_abroad = recipient.address.state.trim() == FOREIGN_STATE;

    let items = lines
        .iter()
        .zip(&line_taxes)
        .map(|(line, taxes)| map_item(line, taxes))
        .collect();

    let payload = NfePayload {
        natureza_operacao: doc.operation.nature.trim().to_string(),
        data_emissao: doc.issued_at,
        tipo_documento: doc.operation.direction.code(),
        finalidade_emissao: doc.operation.purpose.code(),
        local_destino: destination_indicator(&issuer.address.state, &recipient.address.state),
        consumidor_final: u8::from(cpf_destinatario.is_some()),
        presenca_comprador: doc.operation.presence.code(),
        serie: doc.numbering.map(|n| n.series),
        numero: doc.numbering.map(|n| n.number),

        cnpj_emitente,
        cpf_emitente,
        nome_emitente: issuer.name.trim().to_string(),
        inscricao_estadual_emitente: non_blank(issuer.state_registration.as_deref()),
        logradouro_emitente: issuer.address.street.trim().to_string(),
        numero_emitente: street_number(&issuer.address),
        complemento_emitente: non_blank(issuer.address.complement.as_deref()),
        bairro_emitente: issuer.address.district.trim().to_string(),
        municipio_emitente: issuer.address.city.trim().to_string(),
        codigo_municipio_emitente: non_blank(issuer.address.city_code.as_deref()),
        uf_emitente: issuer.address.state.trim().to_ascii_uppercase(),
        cep_emitente: digits_only(&issuer.address.postal_code),
        telefone_emitente: digits(issuer.phone.as_deref()),
        regime_tributario_emitente: ctx.issuer.effective_regime().code(),

        nome_destinatario: recipient.name.trim().to_string(),
        cnpj_destinatario,
        cpf_destinatario,
        inscricao_estadual_destinatario: non_blank(recipient.state_registration.as_deref())
            .filter(|ie| !ie.eq_ignore_ascii_case("ISENTO")),
        indicador_inscricao_estadual_destinatario: state_registration_indicator(
            recipient.state_registration.as_deref(),
        ),
        logradouro_destinatario: recipient.address.street.trim().to_string(),
        numero_destinatario: street_number(&recipient.address),
        complemento_destinatario: non_blank(recipient.address.complement.as_deref()),
        bairro_destinatario: recipient.address.district.trim().to_string(),
        municipio_destinatario: recipient.address.city.trim().to_string(),
        codigo_municipio_destinatario: non_blank(recipient.address.city_code.as_deref()),
        uf_destinatario: recipient.address.state.trim().to_ascii_uppercase(),
        cep_destinatario: if recipient_abroad {
            None
        } else {
            Some(digits_only(&recipient.address.postal_code))
        },
        telefone_destinatario: digits(recipient.phone.as_deref()),
        email_destinatario: non_blank(recipient.email.as_deref()),

        modalidade_frete: doc.freight.code(),
        valor_frete: doc.totals.freight,
        valor_produtos: doc.totals.products,
        valor_desconto: doc.totals.discount,
        valor_total: doc.totals.total,
        icms_base_calculo: tax_totals.icms_base,
        icms_valor_total: tax_totals.icms,
        valor_pis: tax_totals.pis,
        valor_cofins: tax_totals.cofins,
        valor_ibs: tax_totals.ibs,
        valor_cbs: tax_totals.cbs,

        informacoes_adicionais_contribuinte: non_blank(doc.additional_info.as_deref()),

        items,
        notas_referenciadas: ctx.referenced.iter().map(map_reference).collect(),
        formas_pagamento: vec![map_payment(doc.payment, doc.totals.total)],
    };

    Ok(BuiltPayload {
        payload,
        line_taxes,
        tax_totals,
    })
}

/// Resolve the taxes of one line in the context of its document.
pub fn resolve_line_taxes(ctx: &EmissionContext, line: &DocumentLine) -> LineTaxes {
    resolve_line(&TaxInput {
        line_total: line.total,
        regime: ctx.issuer.effective_regime(),
        rates: &ctx.issuer.rates,
        incidence: line.operation.incidence,
        operation_codes: &line.operation.situation_codes,
        product_override: line.tax_override.as_ref(),
        issuer_state: &ctx.issuer.party.address.state,
        destination_state: &ctx.document.recipient.address.state,
        origin: line.origin,
    })
}

/// Copy resolved taxes onto the lines they belong to.
pub fn attach_taxes(lines: &mut [DocumentLine], built: &BuiltPayload) {
    lines.sort_by_key(|l| l.number);
    for (line, taxes) in lines.iter_mut().zip(&built.line_taxes) {
        line.taxes = Some(taxes.clone());
    }
}

fn map_item(line: &DocumentLine, taxes: &LineTaxes) -> PayloadItem {
    PayloadItem {
        numero_item: line.number,
        codigo_produto: line.product_code.trim().to_string(),
        descricao: line.description.trim().to_string(),
        codigo_ncm: digits_only(&line.ncm),
        cfop: digits_only(&line.operation.cfop),
        unidade_comercial: line.unit.trim().to_string(),
        quantidade_comercial: line.quantity,
        valor_unitario_comercial: line.unit_price,
        unidade_tributavel: line.unit.trim().to_string(),
        quantidade_tributavel: line.quantity,
        valor_unitario_tributavel: line.unit_price,
        valor_bruto: line.gross().unwrap_or_default(),
        valor_desconto: line.discount,

        icms_origem: line.origin.code(),
        icms_situacao_tributaria: taxes.icms.situation_code.clone(),
        icms_base_calculo: taxes.icms.base,
        icms_aliquota: taxes.icms.rate,
        icms_valor: taxes.icms.amount,

        pis_situacao_tributaria: taxes.pis.situation_code.clone(),
        pis_base_calculo: taxes.pis.base,
        pis_aliquota_porcentual: taxes.pis.rate,
        pis_valor: taxes.pis.amount,

        cofins_situacao_tributaria: taxes.cofins.situation_code.clone(),
        cofins_base_calculo: taxes.cofins.base,
        cofins_aliquota_porcentual: taxes.cofins.rate,
        cofins_valor: taxes.cofins.amount,

        ibs_situacao_tributaria: taxes.ibs.situation_code.clone(),
        ibs_base_calculo: taxes.ibs.base,
        ibs_aliquota: taxes.ibs.rate,
        ibs_valor: taxes.ibs.amount,

        cbs_situacao_tributaria: taxes.cbs.situation_code.clone(),
        cbs_base_calculo: taxes.cbs.base,
        cbs_aliquota: taxes.cbs.rate,
        cbs_valor: taxes.cbs.amount,
    }
}

fn map_reference(reference: &ReferencedDocument) -> PayloadReference {
    match reference {
        ReferencedDocument::Electronic { access_key } => PayloadReference::Electronic {
            chave_nfe: digits_only(access_key),
        },
        ReferencedDocument::Producer(p) => {
            let (cnpj, cpf) = split_identifier(Some(&p.identifier));
            PayloadReference::Producer {
                uf: p.state.trim().to_ascii_uppercase(),
                mes: p.period.trim().to_string(),
                cnpj,
                cpf,
                inscricao_estadual: p.state_registration.trim().to_string(),
                serie: p.series.trim().to_string(),
                numero: p.number.trim().to_string(),
                modelo: PRODUCER_INVOICE_MODEL.to_string(),
            }
        }
    }
}

fn map_payment(method: PaymentMethod, total: Decimal) -> PayloadPayment {
    let valor_pagamento = match method {
        PaymentMethod::NoPayment => Decimal::ZERO,
        _ => total,
    };
    PayloadPayment {
        forma_pagamento: method.code().to_string(),
        valor_pagamento,
    }
}

/// `idDest`: 1 internal, 2 interstate, 3 abroad.
fn destination_indicator(issuer_state: &str, recipient_state: &str) -> u8 {
    if recipient_state.trim() == FOREIGN_STATE {
        3
    } else if is_interstate(issuer_state, recipient_state) {
        2
    } else {
        1
    }
}

/// `indIEDest`: 1 contribuinte, 2 isento, 9 não contribuinte.
fn state_registration_indicator(state_registration: Option<&str>) -> u8 {
    match state_registration.map(str::trim) {
        Some(ie) if ie.eq_ignore_ascii_case("ISENTO") => 2,
        Some(ie) if !ie.is_empty() => 1,
        _ => 9,
    }
}

/// Split an identifier into its (CNPJ, CPF) slot by digit count.
fn split_identifier(identifier: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(id) = identifier else {
        return (None, None);
    };
    match infer_kind(id) {
        Some(IdentifierKind::Company) => (Some(digits_only(id)), None),
        Some(IdentifierKind::Individual) => (None, Some(digits_only(id))),
        None => (None, None),
    }
}

fn street_number(address: &Address) -> String {
    non_blank(address.number.as_deref()).unwrap_or_else(|| NO_STREET_NUMBER.to_string())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn digits(value: Option<&str>) -> Option<String> {
    value.map(digits_only).filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn issuer() -> IssuerProfile {
        IssuerBuilder::new(
            "fazenda",
            PartyBuilder::new(
                "Fazenda Boa Vista Ltda",
                AddressBuilder::new("Rod. MT-130", "Zona Rural", "Primavera do Leste", "MT", "78850-000")
                    .build(),
            )
            .identifier("11.222.333/0001-81")
            .state_registration("13.123.456-7")
            .phone("(66) 3498-1100")
            .build(),
        )
        .build()
    }

    fn recipient(state: &str, id: &str) -> Party {
        PartyBuilder::new(
            "Armazém Central",
            AddressBuilder::new("Av. Brasil", "Centro", "Cidade", state, "01310-100")
                .number("100")
                .build(),
        )
        .identifier(id)
        .build()
    }

    fn context(recipient: Party) -> EmissionContext {
        DocumentBuilder::new("doc-1", Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
            .nature("Venda de produção do estabelecimento")
            .recipient(recipient)
            .add_line(
                LineBuilder::new(1, "SOJA", "Soja em grãos", dec!(1000), dec!(1))
                    .ncm("1201.90.00")
                    .cfop("5101", TaxIncidence::ALL)
                    .build(),
            )
            .build_unchecked(issuer())
            .unwrap()
    }

    #[test]
    fn maps_identifiers_and_digits() {
        let built = build_payload(&context(recipient("MT", "529.982.247-25"))).unwrap();
        let p = &built.payload;
        assert_eq!(p.cnpj_emitente.as_deref(), Some("11222333000181"));
        assert_eq!(p.cpf_emitente, None);
        assert_eq!(p.cpf_destinatario.as_deref(), Some("52998224725"));
        assert_eq!(p.cnpj_destinatario, None);
        assert_eq!(p.consumidor_final, 1);
        assert_eq!(p.cep_emitente, "78850000");
        assert_eq!(p.telefone_emitente.as_deref(), Some("6634981100"));
        assert_eq!(p.numero_emitente, "S/N");
        assert_eq!(p.numero_destinatario, "100");
        assert_eq!(p.items[0].codigo_ncm, "12019000");
        assert_eq!(p.indicador_inscricao_estadual_destinatario, 9);
    }

    #[test]
    fn unresolved_regime_is_normal() {
        let built = build_payload(&context(recipient("MT", "11.444.777/0001-61"))).unwrap();
        assert_eq!(built.payload.regime_tributario_emitente, 3);
        assert_eq!(built.payload.items[0].icms_situacao_tributaria, "00");
    }

    #[test]
    fn destination_indicator_follows_states() {
        let internal = build_payload(&context(recipient("MT", "11.444.777/0001-61"))).unwrap();
        assert_eq!(internal.payload.local_destino, 1);

        let interstate = build_payload(&context(recipient("SP", "11.444.777/0001-61"))).unwrap();
        assert_eq!(interstate.payload.local_destino, 2);
        assert_eq!(interstate.payload.items[0].icms_aliquota, dec!(12));
    }

    #[test]
    fn abroad_recipient_has_no_postal_code() {
        let mut ctx = context(recipient("EX", "11.444.777/0001-61"));
        ctx.document.recipient.address.postal_code = String::new();
        let built = build_payload(&ctx).unwrap();
        assert_eq!(built.payload.local_destino, 3);
        assert_eq!(built.payload.cep_destinatario, None);
    }

    #[test]
    fn tax_totals_match_items() {
        let built = build_payload(&context(recipient("MT", "11.444.777/0001-61"))).unwrap();
        assert_eq!(built.payload.icms_valor_total, dec!(180.00));
        assert_eq!(built.payload.valor_pis, dec!(16.50));
        assert_eq!(built.payload.valor_cofins, dec!(76.00));
        assert_eq!(built.tax_totals.icms, built.payload.items[0].icms_valor);
    }

    #[test]
    fn no_payment_sends_zero() {
        let built = build_payload(&context(recipient("MT", "11.444.777/0001-61"))).unwrap();
        let pay = &built.payload.formas_pagamento[0];
        assert_eq!(pay.forma_pagamento, "90");
        assert_eq!(pay.valor_pagamento, dec!(0));
    }

    #[test]
    fn exempt_state_registration() {
        let mut r = recipient("MT", "11.444.777/0001-61");
        r.state_registration = Some("isento".into());
        let built = build_payload(&context(r)).unwrap();
        assert_eq!(built.payload.indicador_inscricao_estadual_destinatario, 2);
        assert_eq!(built.payload.inscricao_estadual_destinatario, None);
    }

    #[test]
    fn invalid_context_returns_all_errors() {
        let mut ctx = context(recipient("MT", "11.444.777/0001-61"));
        ctx.document.recipient.identifier = None;
        ctx.document.operation.nature.clear();
        let errors = build_payload(&ctx).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "recipient.identifier"));
        assert!(errors.iter().any(|e| e.field == "operation.nature"));
    }

    #[test]
    fn producer_reference_mapping() {
        let mut ctx = context(recipient("MT", "11.444.777/0001-61"));
        ctx.referenced.push(ReferencedDocument::Producer(ProducerReference {
            state: "mt".into(),
            period: "2406".into(),
            identifier: "111.444.777-35".into(),
            state_registration: "13.999.888-1".into(),
            series: "1".into(),
            number: "4521".into(),
        }));
        let built = build_payload(&ctx).unwrap();
        match &built.payload.notas_referenciadas[0] {
            PayloadReference::Producer { uf, cpf, cnpj, modelo, .. } => {
                assert_eq!(uf, "MT");
                assert_eq!(cpf.as_deref(), Some("11144477735"));
                assert_eq!(cnpj, &None);
                assert_eq!(modelo, "04");
            }
            other => panic!("unexpected reference {other:?}"),
        }
    }

    #[test]
    fn attaches_taxes_to_lines() {
        let mut ctx = context(recipient("MT", "11.444.777/0001-61"));
        let built = build_payload(&ctx).unwrap();
        attach_taxes(&mut ctx.lines, &built);
        assert_eq!(ctx.lines[0].taxes.as_ref().unwrap().pis.amount, dec!(16.50));
    }
}
