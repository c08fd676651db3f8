pub mod add;
pub mod prod;
pub mod scalar;
pub mod sub;

pub use add::{add_op, Add};
pub use prod::{prod_op, Prod};
pub use scalar::{div_scalar_op, prod_scalar_op, DivScalar, ProdScalar};
pub use sub::{sub_op, Sub};
