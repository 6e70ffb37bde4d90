use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::error::{EmissaoError, join_errors};
use super::taxes::*;
use super::types::*;
use super::validation;

/// Builder for a draft document together with its lines and references.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use emissao::core::*;
/// use rust_decimal_macros::dec;
///
/// let issuer = IssuerBuilder::new(
///     "fazenda-boa-vista",
///     PartyBuilder::new("Fazenda Boa Vista Ltda", AddressBuilder::new("Rod. MT-130", "Zona Rural", "Primavera do Leste", "MT", "78850-000").build())
///         .identifier("11.222.333/0001-81")
///         .build(),
/// )
/// .build();
///
/// let ctx = DocumentBuilder::new("doc-1", Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
///     .nature("Venda de produção do estabelecimento")
///     .recipient(PartyBuilder::new("Armazém Central S.A.", AddressBuilder::new("Av. Brasil", "Centro", "Rondonópolis", "MT", "78700-000").number("100").build())
///         .identifier("11.444.777/0001-61")
///         .build())
///     .add_line(LineBuilder::new(1, "SOJA", "Soja em grãos", dec!(1000), dec!(120))
///         .ncm("12019000")
///         .cfop("5101", TaxIncidence::ALL)
///         .unit("SC")
///         .build())
///     .build(issuer)
///     .unwrap();
///
/// assert_eq!(ctx.document.totals.total, dec!(120000));
/// assert_eq!(ctx.document.status, DocumentStatus::Draft);
/// ```
pub struct DocumentBuilder {
    id: String,
    issued_at: DateTime<Utc>,
    nature: String,
    direction: Direction,
    purpose: Purpose,
    presence: Presence,
    recipient: Option<Party>,
    freight: FreightMode,
    freight_value: Decimal,
    payment: PaymentMethod,
    numbering: Option<DocumentNumber>,
    additional_info: Option<String>,
    lines: Vec<DocumentLine>,
    referenced: Vec<ReferencedDocument>,
}

impl DocumentBuilder {
    pub fn new(id: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            issued_at,
            nature: String::new(),
            direction: Direction::Outbound,
            purpose: Purpose::Normal,
            presence: Presence::NotApplicable,
            recipient: None,
            freight: FreightMode::NoFreight,
            freight_value: Decimal::ZERO,
            payment: PaymentMethod::NoPayment,
            numbering: None,
            additional_info: None,
            lines: Vec::new(),
            referenced: Vec::new(),
        }
    }

    pub fn nature(mut self, nature: impl Into<String>) -> Self {
        self.nature = nature.into();
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn purpose(mut self, purpose: Purpose) -> Self {
        self.purpose = purpose;
        self
    }

    pub fn presence(mut self, presence: Presence) -> Self {
        self.presence = presence;
        self
    }

    pub fn recipient(mut self, party: Party) -> Self {
        self.recipient = Some(party);
        self
    }

    pub fn freight(mut self, mode: FreightMode, value: Decimal) -> Self {
        self.freight = mode;
        self.freight_value = value;
        self
    }

    pub fn payment(mut self, method: PaymentMethod) -> Self {
        self.payment = method;
        self
    }

    pub fn numbering(mut self, number: DocumentNumber) -> Self {
        self.numbering = Some(number);
        self
    }

    pub fn additional_info(mut self, info: impl Into<String>) -> Self {
        self.additional_info = Some(info.into());
        self
    }

    pub fn add_line(mut self, line: DocumentLine) -> Self {
        self.lines.push(line);
        self
    }

    pub fn add_reference(mut self, reference: ReferencedDocument) -> Self {
        self.referenced.push(reference);
        self
    }

    /// Build the emission context, calculating totals and running validation.
    /// Returns all validation errors (not just the first).
    pub fn build(self, issuer: IssuerProfile) -> Result<EmissionContext, EmissaoError> {
        let ctx = self.build_unchecked(issuer)?;

        let errors = validation::validate_emission(&ctx);
        if !errors.is_empty() {
            return Err(EmissaoError::Validation(join_errors(&errors)));
        }

        Ok(ctx)
    }

    /// Build without validation: useful for tests or importing external data.
    pub fn build_unchecked(self, issuer: IssuerProfile) -> Result<EmissionContext, EmissaoError> {
        let recipient = self
            .recipient
            .ok_or_else(|| EmissaoError::Builder("recipient is required".into()))?;

        let totals = validation::calculate_totals(&self.lines, self.freight_value);

        let document = FiscalDocument {
            id: self.id,
            operation: OperationInfo {
                nature: self.nature,
                direction: self.direction,
                purpose: self.purpose,
                presence: self.presence,
            },
            issued_at: self.issued_at,
            issuer_id: issuer.id.clone(),
            recipient,
            freight: self.freight,
            payment: self.payment,
            totals,
            numbering: self.numbering,
            additional_info: self.additional_info,
            status: DocumentStatus::Draft,
            gateway_reference: None,
            authorization_key: None,
            status_reason: None,
            artifacts: Artifacts::default(),
            last_attempt: None,
        };

        Ok(EmissionContext {
            document,
            lines: self.lines,
            referenced: self.referenced,
            issuer,
        })
    }
}

/// Builder for an issuer profile.
pub struct IssuerBuilder {
    id: String,
    party: Party,
    regime: Option<TaxRegime>,
    rates: RateTable,
    environment: Environment,
    credential: Credential,
}

impl IssuerBuilder {
    pub fn new(id: impl Into<String>, party: Party) -> Self {
        Self {
            id: id.into(),
            party,
            regime: None,
            rates: RateTable::default(),
            environment: Environment::Sandbox,
            credential: Credential::new(""),
        }
    }

    pub fn regime(mut self, regime: TaxRegime) -> Self {
        self.regime = Some(regime);
        self
    }

    pub fn rates(mut self, rates: RateTable) -> Self {
        self.rates = rates;
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn credential(mut self, token: impl Into<String>) -> Self {
        self.credential = Credential::new(token);
        self
    }

    pub fn build(self) -> IssuerProfile {
        IssuerProfile {
            id: self.id,
            party: self.party,
            regime: self.regime,
            rates: self.rates,
            environment: self.environment,
            credential: self.credential,
        }
    }
}

/// Builder for Party (issuer/recipient).
pub struct PartyBuilder {
    name: String,
    identifier: Option<String>,
    state_registration: Option<String>,
    address: Address,
    phone: Option<String>,
    email: Option<String>,
}

impl PartyBuilder {
    pub fn new(name: impl Into<String>, address: Address) -> Self {
        Self {
            name: name.into(),
            identifier: None,
            state_registration: None,
            address,
            phone: None,
            email: None,
        }
    }

    pub fn identifier(mut self, id: impl Into<String>) -> Self {
        self.identifier = Some(id.into());
        self
    }

    pub fn state_registration(mut self, ie: impl Into<String>) -> Self {
        self.state_registration = Some(ie.into());
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn build(self) -> Party {
        Party {
            name: self.name,
            identifier: self.identifier,
            state_registration: self.state_registration,
            address: self.address,
            phone: self.phone,
            email: self.email,
        }
    }
}

/// Builder for Address.
pub struct AddressBuilder {
    street: String,
    number: Option<String>,
    complement: Option<String>,
    district: String,
    city: String,
    city_code: Option<String>,
    state: String,
    postal_code: String,
}

impl AddressBuilder {
    pub fn new(
        street: impl Into<String>,
        district: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            number: None,
            complement: None,
            district: district.into(),
            city: city.into(),
            city_code: None,
            state: state.into(),
            postal_code: postal_code.into(),
        }
    }

    pub fn number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    pub fn complement(mut self, complement: impl Into<String>) -> Self {
        self.complement = Some(complement.into());
        self
    }

    pub fn city_code(mut self, code: impl Into<String>) -> Self {
        self.city_code = Some(code.into());
        self
    }

    pub fn build(self) -> Address {
        Address {
            street: self.street,
            number: self.number,
            complement: self.complement,
            district: self.district,
            city: self.city,
            city_code: self.city_code,
            state: self.state,
            postal_code: self.postal_code,
        }
    }
}

/// Builder for DocumentLine.
pub struct LineBuilder {
    number: u32,
    product_code: String,
    description: String,
    ncm: String,
    cfop: String,
    incidence: TaxIncidence,
    situation_codes: SituationCodes,
    unit: String,
    quantity: Decimal,
    unit_price: Decimal,
    discount: Decimal,
    origin: ProductOrigin,
    tax_override: Option<ProductTaxOverride>,
}

impl LineBuilder {
    pub fn new(
        number: u32,
        product_code: impl Into<String>,
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            number,
            product_code: product_code.into(),
            description: description.into(),
            ncm: String::new(),
            cfop: String::new(),
            incidence: TaxIncidence::ALL,
            situation_codes: SituationCodes::new(),
            unit: "UN".to_string(),
            quantity,
            unit_price,
            discount: Decimal::ZERO,
            origin: ProductOrigin::National,
            tax_override: None,
        }
    }

    pub fn ncm(mut self, ncm: impl Into<String>) -> Self {
        self.ncm = ncm.into();
        self
    }

    pub fn cfop(mut self, cfop: impl Into<String>, incidence: TaxIncidence) -> Self {
        self.cfop = cfop.into();
        self.incidence = incidence;
        self
    }

    /// Operation-level default situation code for one tax.
    pub fn situation_code(mut self, kind: TaxKind, code: impl Into<String>) -> Self {
        self.situation_codes = self.situation_codes.with(kind, code);
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn discount(mut self, discount: Decimal) -> Self {
        self.discount = discount;
        self
    }

    pub fn origin(mut self, origin: ProductOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn tax_override(mut self, tax_override: ProductTaxOverride) -> Self {
        self.tax_override = Some(tax_override);
        self
    }

    /// Build the line. The total is left at zero when quantity * unit price
    /// overflows; validation reports the line as out of range.
    pub fn build(self) -> DocumentLine {
        let mut line = DocumentLine {
            number: self.number,
            product_code: self.product_code,
            description: self.description,
            ncm: self.ncm,
            operation: OperationCode {
                cfop: self.cfop,
                incidence: self.incidence,
                situation_codes: self.situation_codes,
            },
            unit: self.unit,
            quantity: self.quantity,
            unit_price: self.unit_price,
            discount: self.discount,
            total: Decimal::ZERO,
            origin: self.origin,
            tax_override: self.tax_override,
            taxes: None,
        };
        line.total = line.expected_total().unwrap_or_default();
        line
    }
}
