mod mat_mul;
mod others;
