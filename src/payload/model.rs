//! Gateway-shaped NF-e payload.
//!
//! Flat JSON layout: issuer and recipient fields are suffixed with
//! `_emitente` / `_destinatario`, per-item taxes are prefixed with the tax
//! name. Identifiers, postal codes and phone numbers carry digits only.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request body of a gateway submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NfePayload {
    pub natureza_operacao: String,
    pub data_emissao: DateTime<Utc>,
    /// 0 entrada, 1 saída.
    pub tipo_documento: u8,
    pub finalidade_emissao: u8,
    /// 1 internal, 2 interstate, 3 abroad.
    pub local_destino: u8,
    /// 1 when the recipient is an individual (CPF).
    pub consumidor_final: u8,
    pub presenca_comprador: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serie: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnpj_emitente: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf_emitente: Option<String>,
    pub nome_emitente: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inscricao_estadual_emitente: Option<String>,
    pub logradouro_emitente: String,
    pub numero_emitente: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complemento_emitente: Option<String>,
    pub bairro_emitente: String,
    pub municipio_emitente: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codigo_municipio_emitente: Option<String>,
    pub uf_emitente: String,
    pub cep_emitente: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefone_emitente: Option<String>,
    /// `CRT`: 1 Simples Nacional, 2 excess sublimit, 3 normal.
    pub regime_tributario_emitente: u8,

    pub nome_destinatario: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnpj_destinatario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf_destinatario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inscricao_estadual_destinatario: Option<String>,
    /// 1 contribuinte, 2 isento, 9 não contribuinte.
    pub indicador_inscricao_estadual_destinatario: u8,
    pub logradouro_destinatario: String,
    pub numero_destinatario: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complemento_destinatario: Option<String>,
    pub bairro_destinatario: String,
    pub municipio_destinatario: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codigo_municipio_destinatario: Option<String>,
    pub uf_destinatario: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cep_destinatario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefone_destinatario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_destinatario: Option<String>,

    pub modalidade_frete: u8,
    pub valor_frete: Decimal,
    pub valor_produtos: Decimal,
    pub valor_desconto: Decimal,
    pub valor_total: Decimal,
    pub icms_base_calculo: Decimal,
    pub icms_valor_total: Decimal,
    pub valor_pis: Decimal,
    pub valor_cofins: Decimal,
    pub valor_ibs: Decimal,
    pub valor_cbs: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub informacoes_adicionais_contribuinte: Option<String>,

    pub items: Vec<PayloadItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notas_referenciadas: Vec<PayloadReference>,
    pub formas_pagamento: Vec<PayloadPayment>,
}

impl NfePayload {
    /// Total re-derived from the items: Σ(gross - discount) + freight.
    pub fn derived_total(&self) -> Decimal {
        let items: Decimal = self
            .items
            .iter()
            .map(|i| i.valor_bruto - i.valor_desconto)
            .sum();
        items + self.valor_frete
    }
}

/// One `items[]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadItem {
    pub numero_item: u32,
    pub codigo_produto: String,
    pub descricao: String,
    pub codigo_ncm: String,
    pub cfop: String,
    pub unidade_comercial: String,
    pub quantidade_comercial: Decimal,
    pub valor_unitario_comercial: Decimal,
    pub unidade_tributavel: String,
    pub quantidade_tributavel: Decimal,
    pub valor_unitario_tributavel: Decimal,
    pub valor_bruto: Decimal,
    pub valor_desconto: Decimal,

    pub icms_origem: u8,
    pub icms_situacao_tributaria: String,
    pub icms_base_calculo: Decimal,
    pub icms_aliquota: Decimal,
    pub icms_valor: Decimal,

    pub pis_situacao_tributaria: String,
    pub pis_base_calculo: Decimal,
    pub pis_aliquota_porcentual: Decimal,
    pub pis_valor: Decimal,

    pub cofins_situacao_tributaria: String,
    pub cofins_base_calculo: Decimal,
    pub cofins_aliquota_porcentual: Decimal,
    pub cofins_valor: Decimal,

    pub ibs_situacao_tributaria: String,
    pub ibs_base_calculo: Decimal,
    pub ibs_aliquota: Decimal,
    pub ibs_valor: Decimal,

    pub cbs_situacao_tributaria: String,
    pub cbs_base_calculo: Decimal,
    pub cbs_aliquota: Decimal,
    pub cbs_valor: Decimal,
}

/// One `notas_referenciadas[]` entry; the variants are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadReference {
    Electronic {
        chave_nfe: String,
    },
    Producer {
        uf: String,
        /// AAMM.
        mes: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cnpj: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        cpf: Option<String>,
        inscricao_estadual: String,
        serie: String,
        numero: String,
        /// "04": producer invoice.
        modelo: String,
    },
}

/// One `formas_pagamento[]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadPayment {
    pub forma_pagamento: String,
    pub valor_pagamento: Decimal,
}
