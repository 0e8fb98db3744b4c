use proc_macro::TokenStream as TokenStream1;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{self, Ident};

/// This macro is added before a method of `Table` struct in the impl block.
/// Use this macro to first check if current game phase is exactly the phase in
/// the attribute.
///
/// For example, `#[allowed_phase(PlayerTurns)]` will make a method first check
/// if current game phase is `PlayerTurns`. If not, the method will return
/// `Error::WrongPhase` naming the method and the phase it requires.
///
/// The annotated method must return `crate::Result<_>`, and `GamePhase` must be
/// in scope where the method is defined.
#[proc_macro_attribute]
pub fn allowed_phase(attr: TokenStream1, item: TokenStream1) -> TokenStream1 {
    let mut ast: syn::ImplItemFn = syn::parse(item).unwrap();
    let phase: Ident = syn::parse(attr).expect("allowed_phase expects a single GamePhase variant");
    let early_return = phase_guard(&ast.sig.ident, &phase);
    let early_return: syn::Stmt = syn::parse2(early_return).unwrap();
    ast.block.stmts.insert(0, early_return);
    ast.into_token_stream().into()
}

fn phase_guard(method: &Ident, phase: &Ident) -> TokenStream2 {
    let method_name = method.to_string();
    let phase_name = phase.to_string();
    quote! {
        if self.current_game_phase != GamePhase::#phase {
            return Err(crate::Error::WrongPhase {
                method: #method_name,
                allowed: #phase_name,
                current: format!("{:?}", self.current_game_phase),
            });
        }
    }
}
