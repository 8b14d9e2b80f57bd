use std::fmt::{self, Display};

/// 矩阵原语（内核）的种类，用于错误信息中指明出错的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Create,
    ExtractColumns,
    InsertColumns,
    SampleDropoutMask,
    ApplyDropoutMask,
    ParameterUpdate,
    MatMul,
    Forward,
    ElementWise,
    Loss,
}
impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operation_name = match self {
            Operator::Create => "创建矩阵",
            Operator::ExtractColumns => "提取列",
            Operator::InsertColumns => "插入列",
            Operator::SampleDropoutMask => "采样dropout掩码",
            Operator::ApplyDropoutMask => "应用dropout掩码",
            Operator::ParameterUpdate => "参数更新",
            Operator::MatMul => "矩阵乘法",
            Operator::Forward => "前向传播",
            Operator::ElementWise => "逐元素运算",
            Operator::Loss => "计算损失",
        };
        write!(f, "{}", operation_name)
    }
}

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    LessOrEqual,
    GreaterThan,
}
impl Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operator_name = match self {
            ComparisonOperator::LessOrEqual => "≤",
            ComparisonOperator::GreaterThan => ">",
        };
        write!(f, "{}", operator_name)
    }
}
