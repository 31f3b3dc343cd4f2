use crate::{
    disassembler::{Operand, OperandType},
    metadata::{
        diagnostics::Diagnostics,
        signatures::{NamedTypeRef, TypeSig},
        token::Token,
        typesystem::{GenericContext, Member, Module},
    },
    Result,
};

/// Turns token operands into entities and receives decoding faults
pub trait OperandResolver: Send + Sync {
    /// Resolve `token`, the operand of an instruction whose operand kind is `kind`.
    ///
    /// # Errors
    /// Returns an error if the token does not resolve; the instruction stream ends there.
    fn resolve_operand(
        &self,
        kind: OperandType,
        token: Token,
        context: &GenericContext,
    ) -> Result<Operand>;

    /// Where IL faults are counted
    fn faults(&self) -> &Diagnostics;
}

impl OperandResolver for Module {
    fn resolve_operand(
        &self,
        kind: OperandType,
        token: Token,
        context: &GenericContext,
    ) -> Result<Operand> {
        Ok(match kind {
            OperandType::Field | OperandType::Method => member_operand(self, token, context)?,
            OperandType::Type => Operand::Type(self.resolve_type(token, context)?),
            OperandType::Signature => {
                Operand::Signature(self.standalone_signature(token, context)?)
            }
            // Runtime handles and string literals are left to the caller
            _ => Operand::Token(token),
        })
    }

    fn faults(&self) -> &Diagnostics {
        self.diagnostics()
    }
}

fn member_operand(module: &Module, token: Token, context: &GenericContext) -> Result<Operand> {
    let member = module.resolve_member(token)?;
    let (declaring_type, type_arguments) = match &member {
        Member::Specification(specification) => {
            let declaring_type = match specification.method()? {
                Member::Reference(reference) => reference.parent_type_in(context)?,
                other => definition_owner(&other)?,
            };
            (declaring_type, specification.arguments_in(context)?)
        }
        Member::Reference(reference) => (reference.parent_type_in(context)?, Vec::new()),
        other => (definition_owner(other)?, Vec::new()),
    };

    Ok(Operand::Member {
        member,
        declaring_type,
        type_arguments,
    })
}

fn definition_owner(member: &Member) -> Result<Option<TypeSig>> {
    let owner = match member {
        Member::Field(field) => field.declaring_type()?,
        Member::Method(method) => method.declaring_type()?,
        _ => None,
    };
    Ok(owner.map(|ty| TypeSig::Named(NamedTypeRef::definition(&ty))))
}

/// Leaves every token operand as a raw [`Token`]
#[derive(Debug, Default)]
pub struct RawTokens {
    diagnostics: Diagnostics,
}

impl OperandResolver for RawTokens {
    fn resolve_operand(&self, _: OperandType, token: Token, _: &GenericContext) -> Result<Operand> {
        Ok(Operand::Token(token))
    }

    fn faults(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
