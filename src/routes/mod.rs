pub(crate) mod cotacao;
pub(crate) mod health;
